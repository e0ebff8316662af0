use chrono::Utc;
use leptos::{
    component, create_signal, ev::SubmitEvent, event_target_value, view, For, IntoView, Signal,
    SignalGet, SignalGetUntracked, SignalSet,
};
use leptos_router::{use_navigate, NavigateOptions, A};
use uuid::Uuid;

use crate::astarte::ClientError;
use crate::components::{ErrorBanner, Spinner};
use crate::device_id::{device_id_from_name, random_device_id, validate_device_id};
use crate::request::{create_client_request, use_api_urls, use_config, use_session};
use crate::session::{ApiService, Session};

#[component]
pub fn Home() -> impl IntoView {
    let session = use_session();

    move || match session.get() {
        Some(session) => view! { <Overview session /> }.into_view(),
        None => view! {
            <p>
                "You are not logged in. "
                <A href="/login">"Login"</A>
            </p>
        }
        .into_view(),
    }
}

#[component]
fn Overview(session: Session) -> impl IntoView {
    let expired = session.is_expired(Utc::now());
    let can_list_interfaces = session.can_access(ApiService::RealmManagement);
    let realm = session.realm().to_string();

    view! {
        <h2>{format!("Realm {realm}")}</h2>
        <p class="error" role="alert" class:hidden=!expired>
            "Your token has expired, log in again to refresh it."
        </p>
        <DeviceLookup can_list_interfaces />
        <ApiAccess session />
        <DeviceIdGenerator />
    }
}

#[component]
fn DeviceLookup(can_list_interfaces: bool) -> impl IntoView {
    let navigate = use_navigate();

    let (device_id, set_device_id) = create_signal(String::new());
    let (interface_name, set_interface_name) = create_signal(String::new());
    let (lookup_error, set_lookup_error) = create_signal::<Option<String>>(None);

    let interfaces = create_client_request(
        move || can_list_interfaces.then_some(()),
        |client, ()| async move { client.list_interface_names().await },
    );
    let interface_names = move || {
        interfaces
            .get()
            .flatten()
            .and_then(Result::ok)
            .unwrap_or_default()
    };

    let interfaces_loading = interfaces.loading();
    let interfaces_error =
        Signal::derive(move || interfaces.get().flatten().and_then(Result::err));

    let handle_submit = move |evt: SubmitEvent| {
        evt.prevent_default();

        let device_id = device_id.get_untracked();
        if let Err(err) = validate_device_id(&device_id) {
            set_lookup_error.set(Some(err.to_string()));
            return;
        }

        set_lookup_error.set(None);
        navigate(
            &format!(
                "/devices/{}/interfaces/{}",
                device_id.trim(),
                interface_name.get_untracked().trim()
            ),
            NavigateOptions::default(),
        );
    };

    view! {
        <article>
            <header>
                <strong>"Device data"</strong>
            </header>
            <form on:submit=handle_submit>
                <div class="grid">
                    <input
                        type="text"
                        placeholder="Device ID"
                        required
                        prop:value=device_id
                        on:input=move |evt| set_device_id.set(event_target_value(&evt))
                    />
                    <input
                        type="text"
                        placeholder="Interface name"
                        list="interface-names"
                        required
                        prop:value=interface_name
                        on:input=move |evt| set_interface_name.set(event_target_value(&evt))
                    />
                    <button type="submit">"Show data"</button>
                </div>
                <datalist id="interface-names">
                    <For each=interface_names key=|name| name.clone() let:name>
                        <option value=name></option>
                    </For>
                </datalist>
                <ErrorBanner message=lookup_error />
                <InterfacesStatus loading=interfaces_loading error=interfaces_error />
            </form>
        </article>
    }
}

#[component]
fn InterfacesStatus(loading: Signal<bool>, error: Signal<Option<ClientError>>) -> impl IntoView {
    move || {
        if loading.get() {
            return view! { <Spinner /> }.into_view();
        }

        let message = error
            .get()
            .map(|err| format!("Couldn't load the interface list: {err}"));
        view! { <ErrorBanner message=Signal::derive(move || message.clone()) /> }.into_view()
    }
}

#[component]
fn ApiAccess(session: Session) -> impl IntoView {
    let urls = use_api_urls();
    let config = use_config();

    move || {
        let Some(urls) = urls.get() else {
            return view! { <Spinner /> }.into_view();
        };
        let show_flow = config
            .get()
            .flatten()
            .is_some_and(|config| config.enable_flow_preview);

        let services = [
            ("AppEngine", ApiService::AppEngine, urls.appengine.clone()),
            ("Channels", ApiService::Channels, urls.appengine.clone()),
            (
                "Realm Management",
                ApiService::RealmManagement,
                urls.realm_management.clone(),
            ),
            ("Pairing", ApiService::Pairing, urls.pairing.clone()),
            ("Flow", ApiService::Flow, urls.flow),
        ];

        let rows = services
            .into_iter()
            .filter(|(_, service, _)| show_flow || *service != ApiService::Flow)
            .map(|(name, service, url)| {
                let access = match session.claims().grants(service) {
                    Some(grants) if !grants.is_empty() => grants.join(", "),
                    _ => "No access".to_string(),
                };
                view! {
                    <tr>
                        <th scope="row">{name}</th>
                        <td>{url}</td>
                        <td>{access}</td>
                    </tr>
                }
            })
            .collect::<Vec<_>>();

        view! {
            <div class="overflow-auto">
                <table class="striped">
                    <thead>
                        <tr>
                            <th scope="col">"API"</th>
                            <th scope="col">"URL"</th>
                            <th scope="col">"Access"</th>
                        </tr>
                    </thead>
                    <tbody>{rows}</tbody>
                </table>
            </div>
        }
        .into_view()
    }
}

#[component]
fn DeviceIdGenerator() -> impl IntoView {
    let (namespace, set_namespace) = create_signal(String::new());
    let (name, set_name) = create_signal(String::new());
    let (generated, set_generated) = create_signal(String::new());
    let (generator_error, set_generator_error) = create_signal::<Option<String>>(None);

    let handle_random = move |_| {
        set_generator_error.set(None);
        set_generated.set(random_device_id());
    };

    let handle_from_name = move |evt: SubmitEvent| {
        evt.prevent_default();

        match Uuid::parse_str(namespace.get_untracked().trim()) {
            Ok(namespace) => {
                set_generator_error.set(None);
                set_generated.set(device_id_from_name(namespace, &name.get_untracked()));
            }
            Err(err) => set_generator_error.set(Some(format!("Invalid namespace: {err}"))),
        }
    };

    view! {
        <details>
            <summary>"Generate a device ID"</summary>
            <form on:submit=handle_from_name>
                <div class="grid">
                    <input
                        type="text"
                        placeholder="Namespace UUID"
                        prop:value=namespace
                        on:input=move |evt| set_namespace.set(event_target_value(&evt))
                    />
                    <input
                        type="text"
                        placeholder="Name"
                        prop:value=name
                        on:input=move |evt| set_name.set(event_target_value(&evt))
                    />
                    <button type="submit">"From name"</button>
                    <button type="button" class="secondary" on:click=handle_random>
                        "Random"
                    </button>
                </div>
                <ErrorBanner message=generator_error />
                <code>{generated}</code>
            </form>
        </details>
    }
}
