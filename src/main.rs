#![deny(clippy::all, clippy::pedantic)]
#![allow(non_snake_case, clippy::module_name_repetitions)]

use leptos::{
    component, create_rw_signal, provide_context, view, IntoView, SignalGet, SignalSet,
};
use leptos_router::{use_navigate, NavigateOptions, Route, Router, Routes, A};
use tracing::{info, Level};
use wasm_tracing::WASMLayerConfigBuilder;

use crate::device_data::DeviceData;
use crate::home::Home;
use crate::login::Login;
use crate::request::{create_config_resource, use_session, SessionSignal};

mod astarte;
mod components;
mod config;
mod data_tree;
mod datetime;
mod device_data;
mod device_id;
mod home;
mod login;
mod request;
mod session;

fn main() {
    console_error_panic_hook::set_once();
    wasm_tracing::set_as_global_default_with_config(
        WASMLayerConfigBuilder::new()
            .set_max_level(Level::INFO)
            .build(),
    );
    leptos::mount_to_body(|| view! { <App /> });
}

#[component]
fn App() -> impl IntoView {
    provide_context::<SessionSignal>(create_rw_signal(None));
    provide_context(create_config_resource());

    view! {
        <main class="container-fluid">
            <Router>
                <NavBar />
                <div class="h-full w-full overflow-auto">
                    <Routes>
                        <Route path="/" view=Home />
                        <Route path="/login" view=Login />
                        <Route
                            path="/devices/:device_id/interfaces/:interface_name"
                            view=DeviceData
                        />
                        <Route path="/*any" view=|| view! { <h1>"Not Found"</h1> } />
                    </Routes>
                </div>
            </Router>
        </main>
    }
}

#[component]
fn NavBar() -> impl IntoView {
    let session = use_session();
    let navigate = use_navigate();

    let handle_logout = move |_| {
        info!("logged out");
        session.set(None);
        navigate("/login", NavigateOptions::default());
    };

    view! {
        <nav>
            <ul>
                <li>
                    <strong>
                        <A href="/">"Astarte Dashboard"</A>
                    </strong>
                </li>
            </ul>
            <ul>
                {move || {
                    session
                        .get()
                        .map(|session| view! { <li>{session.realm().to_string()}</li> })
                }}
                <li>
                    <button
                        class="secondary"
                        class:hidden=move || session.get().is_none()
                        on:click=handle_logout
                    >
                        "Logout"
                    </button>
                </li>
            </ul>
        </nav>
    }
}
