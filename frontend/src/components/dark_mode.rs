use super::super::{Model, Msg};
use gloo_storage::{LocalStorage, Storage};
use yew::prelude::*;

const STORAGE_KEY: &str = "image-classing.dark-mode";
const BODY_CLASS: &str = "dark-mode";

/// Display preference kept in the browser, never on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Reads the stored preference; anything unreadable means light.
    pub fn load() -> Self {
        match LocalStorage::get::<bool>(STORAGE_KEY) {
            Ok(true) => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    pub fn store(self) {
        if let Err(e) = LocalStorage::set(STORAGE_KEY, self.is_dark()) {
            log::warn!("Could not store dark mode preference: {:?}", e);
        }
    }

    /// Puts the body class in line with this theme.
    pub fn apply(self) {
        let Some(body) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
        else {
            return;
        };
        let classes = body.class_list();
        let result = if self.is_dark() {
            classes.add_1(BODY_CLASS)
        } else {
            classes.remove_1(BODY_CLASS)
        };
        if let Err(e) = result {
            log::warn!("Could not switch theme: {:?}", e);
        }
    }
}

pub fn render_dark_mode_switch(model: &Model, ctx: &Context<Model>) -> Html {
    let dark = model.theme.is_dark();
    html! {
        <label class="dark-mode-switch" title="Dark mode">
            <i class="fa-solid fa-moon"></i>
            <input
                type="checkbox"
                checked={dark}
                onchange={ctx.link().callback(|_| Msg::ToggleTheme)}
            />
            <span class="switch-state">{ if dark { "ON" } else { "OFF" } }</span>
        </label>
    }
}
