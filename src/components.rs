use leptos::{component, view, IntoView, Signal, SignalGet};

#[component]
pub fn Spinner() -> impl IntoView {
    view! { <span aria-busy="true">"Loading..."</span> }
}

#[component]
pub fn ErrorBanner(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    move || {
        message
            .get()
            .map(|message| view! { <p class="error" role="alert">{message}</p> })
    }
}
