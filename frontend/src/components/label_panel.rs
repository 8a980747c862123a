use super::super::{Field, Model, Msg};
use super::utils::text_input;
use yew::prelude::*;

pub fn render_label_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let onsubmit = link.callback(|e: SubmitEvent| {
        e.prevent_default();
        Msg::AddLabel
    });

    html! {
        <aside class="label-panel">
            <h3>{"Labels"}</h3>
            <ul class="labels">
                { for model.labels.iter().map(|label| render_label_item(model, ctx, label)) }
            </ul>
            <form class="create-row" {onsubmit}>
                { text_input(link, Field::LabelName, &model.drafts.label_name, "New label") }
                <button type="submit" class="icon-btn" title="Add label">
                    <i class="fa-solid fa-plus"></i>
                </button>
            </form>
        </aside>
    }
}

fn render_label_item(model: &Model, ctx: &Context<Model>, label: &str) -> Html {
    let link = ctx.link();
    let is_selected = model.label.as_deref() == Some(label);
    let select = label.to_string();
    let rename = label.to_string();
    let delete = label.to_string();

    html! {
        <li class={classes!("label-item", is_selected.then_some("selected"))} key={label.to_string()}>
            <a onclick={link.callback(move |_| Msg::SelectLabel(select.clone()))}>{ label }</a>
            <button
                class="icon-btn"
                title="Rename label"
                onclick={link.callback(move |_| Msg::RenameLabel(rename.clone()))}
            >
                <i class="fa-solid fa-pen"></i>
            </button>
            <button
                class="icon-btn danger"
                title="Delete label"
                onclick={link.callback(move |_| Msg::DeleteLabel(delete.clone()))}
            >
                <i class="fa-solid fa-trash"></i>
            </button>
        </li>
    }
}
