use std::collections::HashMap;

use chrono::{DateTime, Utc};
use leptos::{
    component, create_memo, create_rw_signal, create_signal, ev::SubmitEvent, event_target_checked,
    event_target_value, spawn_local, store_value, view, Callable, Callback, CollectView, IntoView,
    Params, SignalGet, SignalGetUntracked, SignalSet, SignalUpdate, SignalWith,
    SignalWithUntracked,
};
use leptos_router::{use_params, Params, A};
use serde_json::Value;
use tracing::{error, info};

use crate::astarte::{
    endpoint, types::Ownership, AstarteApi, AstarteValue, DeviceDataRequest, InterfaceDescriptor,
};
use crate::components::{ErrorBanner, Spinner};
use crate::data_tree::{DataKind, DataTree, LeafData, LinearizedRecord};
use crate::datetime::display_datetime;
use crate::request::{create_client_request, use_client};

#[derive(Params, PartialEq)]
struct DeviceDataParams {
    device_id: Option<String>,
    interface_name: Option<String>,
}

/// Query filters as typed in the form.
#[derive(Debug, Clone, Default, PartialEq)]
struct FilterInput {
    path: String,
    since: String,
    since_after: String,
    to: String,
    limit: String,
    keep_milliseconds: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Filters {
    path: Option<String>,
    since: Option<DateTime<Utc>>,
    since_after: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
    keep_milliseconds: bool,
}

impl Filters {
    fn apply(self, mut request: DeviceDataRequest) -> DeviceDataRequest {
        if let Some(path) = self.path {
            request = request.path(path);
        }
        if let Some(since) = self.since {
            request = request.since(since);
        }
        if let Some(since_after) = self.since_after {
            request = request.since_after(since_after);
        }
        if let Some(to) = self.to {
            request = request.to(to);
        }
        if let Some(limit) = self.limit {
            request = request.limit(limit);
        }
        if self.keep_milliseconds {
            request = request.keep_milliseconds(true);
        }

        request
    }
}

#[component]
pub fn DeviceData() -> impl IntoView {
    let params = use_params::<DeviceDataParams>();
    let filters = create_rw_signal(Filters::default());

    let request = create_memo(move |_| {
        let (device_id, interface_name) = params.with(|params| {
            let params = params.as_ref().ok()?;
            Some((params.device_id.clone()?, params.interface_name.clone()?))
        })?;

        Some(filters.get().apply(DeviceDataRequest::new(device_id, interface_name)))
    });

    let tree = create_client_request(
        move || request.get(),
        |client, request| async move { client.get_device_data_tree(&request).await },
    );

    let title = move || {
        request
            .get()
            .map(|request| format!("{} on {}", request.interface_name, request.device_id))
    };

    view! {
        <article>
            <header>
                <strong>{title}</strong>
            </header>
            <DataFilters on_apply=move |new_filters: Filters| filters.set(new_filters) />
            {move || {
                if tree.loading().get() {
                    return view! { <Spinner /> }.into_view();
                }

                match tree.get().flatten() {
                    None => view! {
                        <p>
                            "You are not logged in. "
                            <A href="/login">"Login"</A>
                        </p>
                    }
                    .into_view(),
                    Some(Err(err)) => view! {
                        <p class="error" role="alert">
                            {format!("Couldn't load interface data: {err}")}
                        </p>
                    }
                    .into_view(),
                    Some(Ok(tree)) => {
                        let device_id = request
                            .get_untracked()
                            .map(|request| request.device_id)
                            .unwrap_or_default();
                        // Object aggregates are published as a whole, not per mapping.
                        let can_send = tree.interface.ownership == Ownership::Server
                            && tree.kind != DataKind::DatastreamObject;
                        let send_data = can_send.then(|| {
                            let tree = tree.clone();
                            view! { <SendData device_id tree /> }
                        });

                        view! {
                            <DataTreeView tree />
                            {send_data}
                        }
                        .into_view()
                    }
                }
            }}
        </article>
    }
}

#[component]
fn DataFilters(#[prop(into)] on_apply: Callback<Filters>) -> impl IntoView {
    let input = create_rw_signal(FilterInput::default());
    let (filters_error, set_filters_error) = create_signal::<Option<String>>(None);

    let handle_submit = move |evt: SubmitEvent| {
        evt.prevent_default();

        match input.with_untracked(parse_filters) {
            Ok(filters) => {
                set_filters_error.set(None);
                on_apply.call(filters);
            }
            Err(err) => set_filters_error.set(Some(err)),
        }
    };

    view! {
        <form on:submit=handle_submit>
            <div class="grid">
                <input
                    type="text"
                    placeholder="Path"
                    prop:value=move || input.with(|input| input.path.clone())
                    on:input=move |evt| input.update(|input| input.path = event_target_value(&evt))
                />
                <input
                    type="number"
                    min="1"
                    placeholder="Limit"
                    prop:value=move || input.with(|input| input.limit.clone())
                    on:input=move |evt| input.update(|input| input.limit = event_target_value(&evt))
                />
                <label>
                    <input
                        type="checkbox"
                        role="switch"
                        prop:checked=move || input.with(|input| input.keep_milliseconds)
                        on:change=move |evt| {
                            input.update(|input| input.keep_milliseconds = event_target_checked(&evt));
                        }
                    />
                    "Keep milliseconds"
                </label>
            </div>
            <div class="grid">
                <input
                    type="text"
                    placeholder="Since (2020-10-14T12:00:00Z)"
                    prop:value=move || input.with(|input| input.since.clone())
                    on:input=move |evt| input.update(|input| input.since = event_target_value(&evt))
                />
                <input
                    type="text"
                    placeholder="Since after"
                    prop:value=move || input.with(|input| input.since_after.clone())
                    on:input=move |evt| {
                        input.update(|input| input.since_after = event_target_value(&evt));
                    }
                />
                <input
                    type="text"
                    placeholder="To"
                    prop:value=move || input.with(|input| input.to.clone())
                    on:input=move |evt| input.update(|input| input.to = event_target_value(&evt))
                />
                <button type="submit">"Apply"</button>
            </div>
            <ErrorBanner message=filters_error />
        </form>
    }
}

fn parse_datetime(label: &str, value: &str) -> Result<Option<DateTime<Utc>>, String> {
    match value.trim() {
        "" => Ok(None),
        value => DateTime::parse_from_rfc3339(value)
            .map(|datetime| Some(datetime.with_timezone(&Utc)))
            .map_err(|err| format!("Invalid {label} date: {err}")),
    }
}

fn parse_filters(input: &FilterInput) -> Result<Filters, String> {
    let path = Some(input.path.trim())
        .filter(|path| !path.is_empty())
        .map(ToString::to_string);

    let since = parse_datetime("since", &input.since)?;
    let since_after = parse_datetime("since after", &input.since_after)?;
    let to = parse_datetime("to", &input.to)?;
    if since.is_some() && since_after.is_some() {
        return Err("Use either since or since after, not both".to_string());
    }
    if let (Some(start), Some(to)) = (since.or(since_after), to) {
        if start > to {
            return Err("The start date is after the end date".to_string());
        }
    }

    let limit = match input.limit.trim() {
        "" => None,
        limit => Some(
            limit
                .parse::<u32>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| format!("Invalid limit: {limit}"))?,
        ),
    };

    Ok(Filters {
        path,
        since,
        since_after,
        to,
        limit,
        keep_milliseconds: input.keep_milliseconds,
    })
}

#[component]
pub fn DataTreeView(tree: DataTree) -> impl IntoView {
    if tree.is_empty() {
        return view! { <p>"No data"</p> }.into_view();
    }

    let headers: &[&str] = match tree.kind {
        DataKind::Properties => &["Path", "Type", "Value"],
        DataKind::DatastreamIndividual => &["Path", "Timestamp", "Type", "Value"],
        DataKind::DatastreamObject => &["Path", "Timestamp", "Value"],
    };
    let kind = tree.kind;

    let last_value = serde_json::to_string_pretty(&tree.to_last_value()).unwrap_or_default();
    let data = serde_json::to_string_pretty(&tree.to_data()).unwrap_or_default();
    let rows = tree
        .to_linearized_data()
        .into_iter()
        .map(|record| view! { <RecordRow kind record /> })
        .collect_view();

    view! {
        <p>{format!("{} samples", tree.sample_count())}</p>
        <div class="overflow-auto">
            <table class="striped">
                <thead>
                    <tr>
                        {headers
                            .iter()
                            .map(|header| view! { <th scope="col">{*header}</th> })
                            .collect_view()}
                    </tr>
                </thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
        <details>
            <summary>"Last value"</summary>
            <pre>{last_value}</pre>
        </details>
        <details>
            <summary>"Raw data"</summary>
            <pre>{data}</pre>
        </details>
    }
    .into_view()
}

#[component]
fn RecordRow(kind: DataKind, record: LinearizedRecord) -> impl IntoView {
    let endpoint = record.endpoint().to_string();
    let timestamp = record.timestamp().map(display_datetime);

    let (data_type, value) = match record {
        LinearizedRecord::Property(record) => (Some(record.data_type), record.value.to_string()),
        LinearizedRecord::Individual(record) => {
            (Some(record.data_type), record.value.to_string())
        }
        LinearizedRecord::Object(record) => (
            None,
            record
                .value
                .iter()
                .map(|(field, value)| format!("{field}: {value}"))
                .collect::<Vec<_>>()
                .join(", "),
        ),
    };

    view! {
        <tr>
            <td>{endpoint}</td>
            {(kind != DataKind::Properties).then(|| view! { <td>{timestamp}</td> })}
            {data_type.map(|data_type| view! { <td>{data_type.as_str()}</td> })}
            <td>{value}</td>
        </tr>
    }
}

/// Resolves the concrete path of `pattern` and reads the typed value to
/// publish there.
fn prepare_send(
    interface: &InterfaceDescriptor,
    pattern: &str,
    parameters: &HashMap<String, String>,
    raw_value: &str,
) -> Result<(String, AstarteValue), String> {
    let path = endpoint::substitute(pattern, parameters).map_err(|err| err.to_string())?;
    let json = serde_json::from_str::<Value>(raw_value)
        .map_err(|err| format!("Invalid JSON value: {err}"))?;
    let value = AstarteValue::from_json(interface.mapping_type(&path), &json);

    Ok((path, value))
}

#[component]
fn SendData(device_id: String, tree: DataTree) -> impl IntoView {
    let client = use_client();

    let mapping_endpoints = tree
        .interface
        .mappings
        .iter()
        .map(|mapping| mapping.endpoint.clone())
        .collect::<Vec<_>>();
    let (pattern, set_pattern) =
        create_signal(mapping_endpoints.first().cloned().unwrap_or_default());
    let parameters = create_rw_signal(HashMap::<String, String>::new());
    let (raw_value, set_raw_value) = create_signal(String::new());
    let (status, set_status) = create_signal::<Option<String>>(None);
    let (send_error, set_send_error) = create_signal::<Option<String>>(None);

    let device_id = store_value(device_id);
    let tree = store_value(tree);

    let current_value = move || {
        let path = endpoint::substitute(&pattern.get(), &parameters.get()).ok()?;
        tree.with_value(|tree| match tree.node(&path).filter(|node| node.is_leaf())?.leaf()? {
            LeafData::Property(value) => Some(format!("Current value: {value}")),
            LeafData::Individual(_) | LeafData::Object(_) => None,
        })
    };

    let parameter_inputs = move || {
        endpoint::parameters(&pattern.get())
            .into_iter()
            .map(|name| {
                let placeholder = name.to_string();
                let key = name.to_string();
                let name = name.to_string();
                view! {
                    <input
                        type="text"
                        placeholder=placeholder
                        required
                        prop:value=move || {
                            parameters.with(|values| values.get(&key).cloned().unwrap_or_default())
                        }
                        on:input=move |evt| {
                            let value = event_target_value(&evt);
                            parameters.update(|values| {
                                values.insert(name.clone(), value);
                            });
                        }
                    />
                }
            })
            .collect_view()
    };

    let handle_submit = move |evt: SubmitEvent| {
        evt.prevent_default();
        set_status.set(None);

        let Some(client) = client.get_untracked() else {
            set_send_error.set(Some("Log in to send data".to_string()));
            return;
        };

        let pattern = pattern.get_untracked();
        let parameters = parameters.get_untracked();
        let prepared = tree.with_value(|tree| {
            prepare_send(
                &tree.interface,
                &pattern,
                &parameters,
                &raw_value.get_untracked(),
            )
        });
        let (path, value) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                set_send_error.set(Some(err));
                return;
            }
        };

        let interface = tree.with_value(|tree| tree.interface.clone());
        let device_id = device_id.get_value();
        set_send_error.set(None);

        spawn_local(async move {
            let result = client
                .send_data_to_device(&device_id, &interface, &pattern, &parameters, &value)
                .await;

            match result {
                Ok(()) => {
                    info!(realm = client.session().realm(), %device_id, %path, "data sent");
                    set_status.set(Some(format!("Sent {value} on {path}")));
                }
                Err(err) => {
                    error!("send error: {err}");
                    set_send_error.set(Some(format!("Couldn't send data: {err}")));
                }
            }
        });
    };

    view! {
        <details>
            <summary>"Send data"</summary>
            <form on:submit=handle_submit>
                <div class="grid">
                    <select
                        prop:value=pattern
                        on:change=move |evt| set_pattern.set(event_target_value(&evt))
                    >
                        {mapping_endpoints
                            .into_iter()
                            .map(|mapping_endpoint| {
                                view! {
                                    <option value=mapping_endpoint.clone()>{mapping_endpoint}</option>
                                }
                            })
                            .collect_view()}
                    </select>
                    {parameter_inputs}
                    <input
                        type="text"
                        placeholder="JSON value"
                        required
                        prop:value=raw_value
                        on:input=move |evt| set_raw_value.set(event_target_value(&evt))
                    />
                    <button type="submit">"Send"</button>
                </div>
                <small>{current_value}</small>
                <ErrorBanner message=send_error />
                <small>{move || status.get()}</small>
            </form>
        </details>
    }
}
