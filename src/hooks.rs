use crate::preload::{PreloadCoordinator, PreloadStatus};
use crate::strategies::{HoverIntent, HoverPreloader};
use crate::web::GlooTimer;
use gloo_timers::callback::Interval;
use std::time::Duration;
use yew::prelude::*;

/// Current preload status, re-rendered on every coordinator change.
#[hook]
pub fn use_preload_status(coordinator: PreloadCoordinator) -> PreloadStatus {
    let status = use_state_eq(|| coordinator.status());

    {
        let setter = status.setter();
        use_effect_with(coordinator, move |coordinator| {
            setter.set(coordinator.status());
            let subscription = coordinator.subscribe(move |s| setter.set(*s));
            move || drop(subscription)
        });
    }

    *status
}

/// Current preload status, re-read every `interval_ms`.
#[hook]
pub fn use_polled_status(coordinator: PreloadCoordinator, interval_ms: u32) -> PreloadStatus {
    let status = use_state_eq(|| coordinator.status());

    {
        let setter = status.setter();
        use_effect_with((coordinator, interval_ms), move |(coordinator, interval_ms)| {
            let coordinator = coordinator.clone();
            let interval = Interval::new(*interval_ms, move || setter.set(coordinator.status()));
            move || drop(interval)
        });
    }

    *status
}

/// Mouse handlers that preload `path` after hovering for `delay_ms`.
#[derive(Clone)]
pub struct HoverHandlers {
    pub on_enter: Callback<MouseEvent>,
    pub on_leave: Callback<MouseEvent>,
}

/// Requires a `PreloadCoordinator` context; without one the handlers do nothing.
#[hook]
pub fn use_hover_preload(path: AttrValue, delay_ms: u32) -> HoverHandlers {
    let coordinator = use_context::<PreloadCoordinator>();
    let intent = use_mut_ref(|| None::<HoverIntent>);
    let preloader = use_memo((coordinator, delay_ms), |(coordinator, delay_ms)| {
        coordinator.as_ref().map(|c| {
            HoverPreloader::new(
                c.clone(),
                GlooTimer,
                Duration::from_millis(u64::from(*delay_ms)),
            )
        })
    });

    let on_enter = {
        let intent = intent.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(preloader) = preloader.as_ref() {
                // Replacing a previous intent cancels it.
                *intent.borrow_mut() = Some(preloader.hover(&path));
            }
        })
    };

    let on_leave = Callback::from(move |_: MouseEvent| {
        intent.borrow_mut().take();
    });

    HoverHandlers { on_enter, on_leave }
}
