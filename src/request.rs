use std::future::Future;

use leptos::{
    create_local_resource, create_rw_signal, use_context, window, Resource, RwSignal, Signal,
    SignalGet,
};
use tracing::error;

use crate::astarte::{AstarteClient, ClientError};
use crate::config::{load_config, ApiUrls, DashboardConfig};
use crate::session::Session;

pub type SessionSignal = RwSignal<Option<Session>>;
pub type ConfigResource = Resource<(), Option<DashboardConfig>>;
pub type ClientResource<Request, T> =
    Resource<Option<(ApiUrls, Session, Request)>, Option<Result<T, ClientError>>>;

pub fn create_config_resource() -> ConfigResource {
    create_local_resource(
        || (),
        |()| async move {
            let origin = window().location().origin().unwrap_or_default();
            match load_config(&origin).await {
                Ok(config) => Some(config),
                Err(err) => {
                    error!("configuration error: {err}");
                    None
                }
            }
        },
    )
}

pub fn use_session() -> SessionSignal {
    use_context::<SessionSignal>().unwrap_or_else(|| create_rw_signal(None))
}

pub fn use_config() -> ConfigResource {
    use_context::<ConfigResource>().unwrap_or_else(create_config_resource)
}

pub fn use_api_urls() -> Signal<Option<ApiUrls>> {
    let config = use_config();

    Signal::derive(move || {
        let config = config.get().flatten()?;
        match config.api_urls() {
            Ok(urls) => Some(urls),
            Err(err) => {
                error!("configuration error: {err}");
                None
            }
        }
    })
}

/// A client for the logged in realm, once both the configuration and the
/// session are available.
pub fn use_client() -> Signal<Option<AstarteClient>> {
    let session = use_session();
    let urls = use_api_urls();

    Signal::derive(move || Some(AstarteClient::new(urls.get()?, session.get()?)))
}

/// Runs `fetch` with a client every time `request` changes. Resolves to
/// `None` while there is no session, no configuration or no request.
pub fn create_client_request<Request, T, Fu>(
    request: impl Fn() -> Option<Request> + 'static,
    fetch: impl Fn(AstarteClient, Request) -> Fu + 'static,
) -> ClientResource<Request, T>
where
    Request: PartialEq + Clone + 'static,
    T: 'static,
    Fu: Future<Output = Result<T, ClientError>> + 'static,
{
    let session = use_session();
    let urls = use_api_urls();

    let source = move || Some((urls.get()?, session.get()?, request()?));

    create_local_resource(source, move |source| {
        let response = source
            .map(|(urls, session, request)| fetch(AstarteClient::new(urls, session), request));

        async move {
            let result = response?.await;
            if let Err(err) = &result {
                error!("request error: {err}");
            }
            Some(result)
        }
    })
}
