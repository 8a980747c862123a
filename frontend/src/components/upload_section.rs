use super::super::{MAX_FILES_PER_UPLOAD, Model, Msg};
use super::utils::{debounce, extract_image_files};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="upload-section">
            {
                match model.upload {
                    Some(progress) => render_progress(progress.processed, progress.total),
                    None => render_file_input_area(model, ctx),
                }
            }
        </div>
    }
}

fn render_progress(processed: usize, total: usize) -> Html {
    let percentage = if total == 0 {
        0.0
    } else {
        processed as f64 / total as f64 * 100.0
    };
    html! {
        <div class="upload-progress">
            <i class="fa-solid fa-spinner fa-spin"></i>
            <span>{ format!(" Processing {} / {}", processed, total) }</span>
            <div class="meter">
                <div class="meter-fill" style={format!("width: {}%", percentage)}></div>
            </div>
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let files = input.files();
        let files_to_process = files.as_ref().map(extract_image_files).unwrap_or_default();

        input.set_value("");

        if !files_to_process.is_empty() {
            Msg::FilesAdded(files_to_process)
        } else {
            Msg::SetError(Some("No valid image files selected.".into()))
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        let input = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("file-input"));
        if let Some(input) = input {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                multiple=true
                accept=".jpg,.jpeg,.png,.webp,.bmp"
                style="display: none;"
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Drag & drop images here, or click"}</p>
                    <p class="file-types">
                        { format!("JPG, PNG, WEBP, BMP | up to {} files at once", MAX_FILES_PER_UPLOAD) }
                    </p>
                </div>
            </div>
        </>
    }
}
