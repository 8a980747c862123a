use super::super::{Field, Model, Msg};
use super::utils::text_input;
use yew::prelude::*;

pub fn render_auth_form(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let onsubmit = link.callback(|e: SubmitEvent| {
        e.prevent_default();
        Msg::Login
    });

    html! {
        <form class="auth-form" {onsubmit}>
            <h2>{"Sign in"}</h2>
            { text_input(link, Field::Username, &model.drafts.username, "Username") }
            { text_input(link, Field::Password, &model.drafts.password, "Password") }
            <div class="button-container">
                <button type="submit" class="analyze-btn">
                    <i class="fa-solid fa-right-to-bracket"></i>{" Login"}
                </button>
                <button
                    type="button"
                    class="analyze-btn secondary"
                    onclick={link.callback(|_| Msg::Register)}
                >
                    <i class="fa-solid fa-user-plus"></i>{" Register"}
                </button>
            </div>
        </form>
    }
}
