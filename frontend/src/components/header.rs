use super::super::{Model, Msg, Page};
use super::dark_mode::render_dark_mode_switch;
use yew::prelude::*;

/// Renders the application header
pub fn render_header(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let breadcrumb = match &model.page {
        Page::Project(name) => html! {
            <span class="breadcrumb">
                <a onclick={link.callback(|_| Msg::CloseProject)}>{"Projects"}</a>
                {" / "}{ name }
            </span>
        },
        _ => html! {},
    };

    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-tags"></i> {" Image Classing"}</h1>
            { breadcrumb }
            <div class="top-right">
                {
                    match &model.user {
                        Some(user) => html! {
                            <div class="user-info">
                                <span class="user-name">{ &user.username }</span>
                                <button
                                    class="logout-button"
                                    onclick={link.callback(|_| Msg::Logout)}
                                    title="Logout"
                                >
                                    <i class="fa-solid fa-sign-out-alt"></i>
                                    {" Logout"}
                                </button>
                            </div>
                        },
                        None => html! {},
                    }
                }
                { render_dark_mode_switch(model, ctx) }
            </div>
        </header>
    }
}
