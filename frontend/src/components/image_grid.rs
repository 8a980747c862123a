use super::super::{Field, Model, Msg};
use super::utils::text_input;
use crate::api::image_src;
use yew::prelude::*;

pub fn render_image_grid(model: &Model, ctx: &Context<Model>) -> Html {
    if model.images.is_empty() {
        return html! { <p class="empty">{"No images in this label."}</p> };
    }

    html! {
        <div class="image-grid-container">
            { render_toolbar(model, ctx) }
            <div id="image-previews">
                { for model.images.iter().map(|image| render_image_item(model, ctx, image)) }
            </div>
        </div>
    }
}

fn render_toolbar(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let nothing_selected = model.selected.is_empty();

    html! {
        <div class="button-container">
            <span class="selection-count">
                { format!("{} / {} selected", model.selected.len(), model.images.len()) }
            </span>
            <button class="analyze-btn secondary" onclick={link.callback(|_| Msg::SelectAllImages)}>
                {"Select all"}
            </button>
            <button
                class="analyze-btn secondary"
                disabled={nothing_selected}
                onclick={link.callback(|_| Msg::ClearSelection)}
            >
                {"Clear"}
            </button>
            <button
                class="analyze-btn"
                style="background-color: var(--danger-color);"
                disabled={nothing_selected}
                onclick={link.callback(|_| Msg::DeleteSelected)}
            >
                <i class="fa-solid fa-trash"></i>{" Delete"}
            </button>
            { text_input(link, Field::MoveTarget, &model.drafts.move_target, "Target label") }
            <button
                class="analyze-btn"
                disabled={nothing_selected}
                onclick={link.callback(|_| Msg::MoveSelected)}
            >
                <i class="fa-solid fa-right-left"></i>{" Move"}
            </button>
        </div>
    }
}

fn render_image_item(model: &Model, ctx: &Context<Model>, image: &str) -> Html {
    let link = ctx.link();
    let is_selected = model.selected.contains(image);
    let src = match (&model.user, model.current_project(), &model.label) {
        (Some(user), Some(project), Some(label)) => {
            image_src(&user.username, project, model.data_type, label, image)
        }
        _ => return html! {},
    };
    let toggle = image.to_string();
    let rename = image.to_string();

    html! {
        <div
            class={classes!("preview-item", is_selected.then_some("selected"))}
            key={image.to_string()}
            onclick={link.callback(move |_| Msg::ToggleImage(toggle.clone()))}
            title={image.to_string()}
        >
            <img src={src} alt={image.to_string()} loading="lazy" />
            <button
                class="rename-btn"
                title="Rename this image"
                onclick={link.callback(move |e: MouseEvent| {
                    e.stop_propagation();
                    Msg::RenameImage(rename.clone())
                })}
            >
                <i class="fa-solid fa-pen" style="font-size: 10px;"></i>
            </button>
        </div>
    }
}
