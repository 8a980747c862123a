use super::super::{Field, Model, Msg};
use super::utils::{debounce, text_input};
use yew::prelude::*;

pub fn render_project_list(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();

    html! {
        <section class="project-list">
            <div class="create-row">
                { text_input(link, Field::ProjectName, &model.drafts.project_name, "New project name") }
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::CreateProject)
                    })}
                >
                    <i class="fa-solid fa-plus"></i>{" Create project"}
                </button>
            </div>
            {
                if model.projects.is_empty() {
                    html! { <p class="empty">{"No projects yet."}</p> }
                } else {
                    html! {
                        <ul class="projects">
                            { for model.projects.iter().map(|name| render_project_item(ctx, name)) }
                        </ul>
                    }
                }
            }
        </section>
    }
}

fn render_project_item(ctx: &Context<Model>, name: &str) -> Html {
    let link = ctx.link();
    let open = name.to_string();
    let rename = name.to_string();
    let delete = name.to_string();

    html! {
        <li class="project-item" key={name.to_string()}>
            <a class="project-name" onclick={link.callback(move |_| Msg::OpenProject(open.clone()))}>
                <i class="fa-solid fa-folder"></i>{" "}{ name }
            </a>
            <button
                class="icon-btn"
                title="Rename project"
                onclick={link.callback(move |_| Msg::RenameProject(rename.clone()))}
            >
                <i class="fa-solid fa-pen"></i>
            </button>
            <button
                class="icon-btn danger"
                title="Delete project"
                onclick={link.callback(move |_| Msg::DeleteProject(delete.clone()))}
            >
                <i class="fa-solid fa-trash"></i>
            </button>
        </li>
    }
}
