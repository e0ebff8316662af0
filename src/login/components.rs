use leptos::{
    component, create_effect, create_signal, event_target_value, ev::SubmitEvent, view, IntoView,
    SignalGet, SignalGetUntracked, SignalSet,
};
use leptos_router::{use_navigate, NavigateOptions};
use tracing::info;

use crate::components::ErrorBanner;
use crate::config::AuthType;
use crate::request::{use_config, use_session};
use crate::session::Session;

#[component]
pub fn Login() -> impl IntoView {
    let session = use_session();
    let config = use_config();
    let navigate = use_navigate();

    let (realm, set_realm) = create_signal(String::new());
    let (token, set_token) = create_signal(String::new());
    let (login_error, set_login_error) = create_signal::<Option<String>>(None);

    create_effect(move |_| {
        let Some(default_realm) = config.get().flatten().and_then(|config| config.default_realm)
        else {
            return;
        };

        if realm.get_untracked().is_empty() {
            set_realm.set(default_realm);
        }
    });

    let oauth_link = move || {
        let config = config.get().flatten()?;
        let url = config.oauth_api_url()?.to_string();
        let class = if config.default_auth == AuthType::OAuth {
            "primary"
        } else {
            "secondary"
        };

        Some(view! {
            <a href=url role="button" class=class>
                "Login with OAuth"
            </a>
        })
    };

    let handle_submit = move |evt: SubmitEvent| {
        evt.prevent_default();

        match Session::new(&realm.get_untracked(), &token.get_untracked()) {
            Ok(new_session) => {
                info!(realm = new_session.realm(), "logged in");
                set_login_error.set(None);
                session.set(Some(new_session));
                navigate("/", NavigateOptions::default());
            }
            Err(err) => set_login_error.set(Some(err.to_string())),
        }
    };

    view! {
        <article>
            <header>
                <strong>"Login"</strong>
            </header>
            <form on:submit=handle_submit>
                <label>
                    "Realm"
                    <input
                        type="text"
                        required
                        prop:value=realm
                        on:input=move |evt| set_realm.set(event_target_value(&evt))
                    />
                </label>
                <label>
                    "Token"
                    <textarea
                        rows="6"
                        required
                        prop:value=token
                        on:input=move |evt| set_token.set(event_target_value(&evt))
                    ></textarea>
                </label>
                <ErrorBanner message=login_error />
                <button type="submit">"Login"</button>
            </form>
            {oauth_link}
        </article>
    }
}
