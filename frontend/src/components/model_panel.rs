use super::super::{Model, Msg};
use shared::{DataType, JobStatus, VerificationResults};
use yew::prelude::*;

pub fn render_model_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let status = model
        .model_info
        .as_ref()
        .map(|info| info.training_status)
        .unwrap_or(JobStatus::Idle);
    let trained = model.model_info.as_ref().is_some_and(|info| info.trained);
    let can_verify = trained
        && model.data_type == DataType::Verification
        && model.label.is_some()
        && !model.verify_status.is_some_and(|s| s.is_running());

    html! {
        <div class="model-panel">
            <div class="model-status">
                <strong>{"Model: "}</strong>
                { render_status(status, trained) }
                {
                    match &model.model_info {
                        Some(info) if !info.classes.is_empty() => html! {
                            <span class="classes">{ format!(" Classes: {}", info.classes.join(", ")) }</span>
                        },
                        _ => html! {},
                    }
                }
            </div>
            <div class="button-container">
                <button
                    class="analyze-btn"
                    disabled={status.is_running()}
                    onclick={link.callback(|_| Msg::Train)}
                >
                    {
                        if status.is_running() {
                            html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Training..."}</> }
                        } else {
                            html! { <><i class="fa-solid fa-brain"></i>{" Train"}</> }
                        }
                    }
                </button>
                <button
                    class="analyze-btn"
                    style="background-color: var(--primary-color);"
                    disabled={!can_verify}
                    title="Verify the selected verify-data label"
                    onclick={link.callback(|_| Msg::Verify)}
                >
                    {
                        if model.verify_status.is_some_and(|s| s.is_running()) {
                            html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Verifying..."}</> }
                        } else {
                            html! { <><i class="fa-solid fa-magnifying-glass"></i>{" Verify"}</> }
                        }
                    }
                </button>
            </div>
            {
                match &model.verification {
                    Some(results) if model.data_type == DataType::Verification => render_results(results),
                    _ => html! {},
                }
            }
        </div>
    }
}

fn render_status(status: JobStatus, trained: bool) -> Html {
    let text = match status {
        JobStatus::Idle if trained => "trained".to_string(),
        JobStatus::Idle => "not trained".to_string(),
        other => other.to_string(),
    };
    html! { <span class={classes!("job-status", text.replace(' ', "-"))}>{ text }</span> }
}

/// The class with the highest confidence for one image.
pub fn best_class(confidences: &std::collections::BTreeMap<String, f64>) -> Option<(&str, f64)> {
    confidences
        .iter()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(class, value)| (class.as_str(), *value))
}

fn render_results(results: &VerificationResults) -> Html {
    html! {
        <div class="results-container">
            <div class="result-header">
                <h3>{"Verification results"}</h3>
                {
                    match results.exec_time_ms {
                        Some(ms) => html! { <span class="exec-time">{ format!("{:.0} ms", ms) }</span> },
                        None => html! {},
                    }
                }
            </div>
            <div class="detailed-results">
                { for results.images.iter().map(|(image, confidences)| {
                    let predicted = best_class(confidences)
                        .map(|(class, value)| format!("{} ({:.1}%)", class, value * 100.0))
                        .unwrap_or_default();
                    html! {
                        <div class="result-image" key={image.clone()}>
                            <div class="result-label"><strong>{ image }</strong>{ format!(" : {}", predicted) }</div>
                            <div class="result-bars">
                                { for results.classes.iter().map(|class| {
                                    let percentage = confidences.get(class).copied().unwrap_or(0.0) * 100.0;
                                    html! {
                                        <div class="result-item">
                                            <div class="result-label">{ class }</div>
                                            <div class="result-bar-container">
                                                <div class="result-bar" style={format!("width: {}%", percentage)}></div>
                                            </div>
                                            <div class="result-value">{ format!("{:.1}%", percentage) }</div>
                                        </div>
                                    }
                                })}
                            </div>
                        </div>
                    }
                })}
            </div>
        </div>
    }
}
