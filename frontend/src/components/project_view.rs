use super::super::{Model, Msg};
use super::image_grid::render_image_grid;
use super::label_panel::render_label_panel;
use super::model_panel::render_model_panel;
use super::upload_section::render_upload_section;
use shared::DataType;
use yew::prelude::*;

pub fn render_project_view(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let tab = |data_type: DataType, title: &str| {
        html! {
            <button
                class={classes!("tab", (model.data_type == data_type).then_some("active"))}
                onclick={link.callback(move |_| Msg::SelectDataType(data_type))}
            >
                { title.to_string() }
            </button>
        }
    };

    html! {
        <section class="project-view">
            {
                match &model.project {
                    Some(details) => html! {
                        <p class="project-meta">
                            { format!("Created {}", details.created_at) }
                            { if details.trained { " | trained" } else { "" } }
                        </p>
                    },
                    None => html! {},
                }
            }
            { render_model_panel(model, ctx) }
            <div class="tabs">
                { tab(DataType::Training, "Training data") }
                { tab(DataType::Verification, "Verify data") }
            </div>
            <div class="workspace">
                { render_label_panel(model, ctx) }
                <div class="label-content">
                    {
                        if model.label.is_some() {
                            html! {
                                <>
                                    { render_upload_section(model, ctx) }
                                    { render_image_grid(model, ctx) }
                                </>
                            }
                        } else {
                            html! { <p class="empty">{"Select or add a label."}</p> }
                        }
                    }
                </div>
            </div>
        </section>
    }
}
