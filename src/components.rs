//! Yew components wired to the preload coordinator.

use crate::config::{HOVER_DELAY_MS, STATUS_POLL_MS};
use crate::hooks::{use_hover_preload, use_polled_status, use_preload_status};
use crate::preload::{PreloadCoordinator, PreloadState, PreloadStatus};
use crate::strategies::VisibilityTrigger;
use crate::utils::ClassNameBuilder;
use crate::web::observe_visibility;
use log::warn;
use web_sys::Element;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct PreloadLinkProps {
    pub to: AttrValue,
    #[prop_or_default]
    pub class: Option<AttrValue>,
    #[prop_or(HOVER_DELAY_MS)]
    pub hover_delay_ms: u32,
    #[prop_or_default]
    pub children: Html,
}

/// Anchor that preloads its target after a short hover.
#[function_component(PreloadLink)]
pub fn preload_link(props: &PreloadLinkProps) -> Html {
    let handlers = use_hover_preload(props.to.clone(), props.hover_delay_ms);
    let class = crate::cn!("preload-link", props.class.as_deref());

    html! {
        <a
            href={props.to.clone()}
            {class}
            onmouseenter={handlers.on_enter}
            onmouseleave={handlers.on_leave}
        >
            { props.children.clone() }
        </a>
    }
}

#[derive(Properties, PartialEq)]
pub struct PreloadOnVisibleProps {
    pub path: AttrValue,
    #[prop_or_default]
    pub children: Html,
}

/// Wrapper that preloads `path` the first time it scrolls into view.
#[function_component(PreloadOnVisible)]
pub fn preload_on_visible(props: &PreloadOnVisibleProps) -> Html {
    let node = use_node_ref();
    let coordinator = use_context::<PreloadCoordinator>();

    {
        let node = node.clone();
        use_effect_with(
            (coordinator, props.path.clone()),
            move |(coordinator, path)| {
                let observer = match (coordinator, node.cast::<Element>()) {
                    (Some(coordinator), Some(element)) => {
                        let trigger = VisibilityTrigger::new(coordinator.clone(), path.to_string());
                        observe_visibility(&element, trigger)
                            .map_err(|err| warn!("could not observe {}: {:?}", path, err))
                            .ok()
                    }
                    _ => None,
                };
                move || drop(observer)
            },
        );
    }

    html! {
        <div ref={node} class="preload-on-visible">
            { props.children.clone() }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct PreloadStatusPanelProps {
    pub coordinator: PreloadCoordinator,
}

fn state_label(state: PreloadState) -> &'static str {
    match state {
        PreloadState::Pending => "pending",
        PreloadState::Loading => "loading",
        PreloadState::Preloaded => "preloaded",
    }
}

/// Development overlay listing every route and its preload state.
#[function_component(PreloadStatusPanel)]
pub fn preload_status_panel(props: &PreloadStatusPanelProps) -> Html {
    let status = use_preload_status(props.coordinator.clone());
    let routes = props.coordinator.routes();

    let panel_class = crate::cn!(
        "preload-status",
        (status.loading_count > 0).then_some("preload-status--busy"),
        (status.total > 0 && status.pending_count == 0).then_some("preload-status--complete"),
    );

    html! {
        <aside class={panel_class}>
            <header class="preload-status__summary">
                { format!(
                    "{}/{} preloaded, {} loading, {} pending",
                    status.preloaded_count, status.total, status.loading_count, status.pending_count
                ) }
            </header>
            <ul class="preload-status__routes">
                { for routes.iter().map(|route| {
                    let state = props.coordinator.state(&route.path).unwrap_or(PreloadState::Pending);
                    let mut row = ClassNameBuilder::new();
                    row.add("preload-status__route")
                        .add_if(state == PreloadState::Loading, "is-loading")
                        .add_if_else(state == PreloadState::Preloaded, "is-ready", "is-idle");
                    html! {
                        <li class={row.build()}>
                            <code>{ route.path.clone() }</code>
                            <span>{ state_label(state) }</span>
                        </li>
                    }
                }) }
            </ul>
        </aside>
    }
}

#[derive(Properties, PartialEq)]
pub struct PreloadStatusBadgeProps {
    pub coordinator: PreloadCoordinator,
    #[prop_or(STATUS_POLL_MS)]
    pub poll_ms: u32,
}

fn badge_label(status: &PreloadStatus) -> String {
    format!("{}/{}", status.preloaded_count, status.total)
}

/// Compact progress badge that re-reads the status on a fixed interval.
#[function_component(PreloadStatusBadge)]
pub fn preload_status_badge(props: &PreloadStatusBadgeProps) -> Html {
    let status = use_polled_status(props.coordinator.clone(), props.poll_ms);
    let class = crate::cn!(
        "preload-badge",
        (status.total > 0 && status.pending_count == 0).then_some("preload-badge--complete"),
    );

    html! {
        <span {class} title="preloaded routes">
            { badge_label(&status) }
        </span>
    }
}
