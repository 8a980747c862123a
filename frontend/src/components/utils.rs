use super::super::{Field, Model, Msg};
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::{FileList, HtmlInputElement};
use yew::html::Scope;
use yew::prelude::*;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

// Debounce function to limit button events
pub fn debounce<F>(duration: i32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));
    let timeout_clone = Rc::clone(&timeout);

    Callback::from(move |_| {
        let mut timeout_ref = timeout_clone.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        let new_timeout = Timeout::new(duration as u32, move || {
            inner_callback();
        });

        *timeout_ref = Some(new_timeout);
    })
}

pub fn is_image_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Files the server will accept, judged by extension like the server does.
pub fn extract_image_files(file_list: &FileList) -> Vec<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .filter(|file| {
            let keep = is_image_file_name(&file.name());
            if !keep {
                log::warn!("Skipping non-image file: {}", file.name());
            }
            keep
        })
        .map(GlooFile::from)
        .collect()
}

/// Text input bound to one of the draft fields.
pub fn text_input(link: &Scope<Model>, field: Field, value: &str, placeholder: &str) -> Html {
    let input_type = if field == Field::Password { "password" } else { "text" };
    let oninput = link.callback(move |e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::Input(field, input.value())
    });
    html! {
        <input
            type={input_type}
            class="text-input"
            value={value.to_string()}
            placeholder={placeholder.to_string()}
            {oninput}
        />
    }
}

pub fn prompt(message: &str, default: &str) -> Option<String> {
    let answer = web_sys::window()?
        .prompt_with_message_and_default(message, default)
        .ok()
        .flatten()?;
    let answer = answer.trim().to_string();
    (!answer.is_empty() && answer != default).then_some(answer)
}

pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

pub fn render_error_message(model: &Model, ctx: &Context<Model>) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message" onclick={ctx.link().callback(|_| Msg::SetError(None))}>
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}

pub fn render_notice(model: &Model, _ctx: &Context<Model>) -> Html {
    match &model.notice {
        Some(notice) => html! {
            <div class="notice-message">
                <i class="fa-solid fa-circle-info"></i>
                <p>{ notice }</p>
            </div>
        },
        None => html! {},
    }
}
