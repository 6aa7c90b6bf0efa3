//! Demo shell for the e-learning site: registers the site's routes and wires
//! every preloading strategy into a Yew app.

use route_preload::cache::configure_class_cache;
use route_preload::components::{
    PreloadLink, PreloadOnVisible, PreloadStatusBadge, PreloadStatusPanel,
};
use route_preload::config::{PreloadConfig, CHUNK_BASE_URL};
use route_preload::logging::{self, LogConfig};
use route_preload::preload::{PreloadCoordinator, Priority, RouteDescriptor};
use route_preload::strategies::{preload_by_priority, NetworkAwarePreloader};
use route_preload::web::{self, FetchLoader, WasmSpawner};
use std::rc::Rc;
use yew::prelude::*;

// (path, chunk, priority)
const SITE_ROUTES: &[(&str, &str, Priority)] = &[
    ("/", "home", Priority::Critical),
    ("/courses", "catalog", Priority::High),
    ("/courses/detail", "catalog", Priority::Low),
    ("/dashboard/student", "dashboard", Priority::High),
    ("/dashboard/instructor", "dashboard", Priority::Low),
    ("/design-system", "design-system", Priority::Low),
    ("/trust", "trust", Priority::Low),
    ("/features", "features", Priority::Low),
    ("/community", "community", Priority::Low),
    ("/guide", "guide", Priority::Low),
];

// Fetched only on fast connections.
const NETWORK_AWARE_ROUTES: &[&str] = &["/dashboard/instructor", "/design-system"];

fn build_coordinator() -> PreloadCoordinator {
    let coordinator = PreloadCoordinator::new(FetchLoader::new(CHUNK_BASE_URL), WasmSpawner);
    for (path, chunk, priority) in SITE_ROUTES {
        coordinator.register_route(
            RouteDescriptor::new(*path)
                .with_chunk(*chunk)
                .with_priority(*priority),
        );
    }
    coordinator
}

#[derive(Properties, PartialEq)]
struct AppProps {
    config: Rc<PreloadConfig>,
}

#[function_component(App)]
fn app(props: &AppProps) -> Html {
    let coordinator = use_memo((), |_| build_coordinator());

    {
        let coordinator = (*coordinator).clone();
        let config = props.config.clone();
        use_effect_with((), move |_| {
            preload_by_priority(&coordinator, web::idle());

            let network = NetworkAwarePreloader::new(
                coordinator.clone(),
                NETWORK_AWARE_ROUTES.iter().copied(),
                config.min_connection,
            )
            .respect_save_data(config.respect_save_data);
            network.evaluate(web::current_network());
            let listener = web::on_network_change(move |info| {
                network.evaluate(info);
            });

            move || drop(listener)
        });
    }

    let delay = props.config.hover_delay_ms;
    html! {
        <ContextProvider<PreloadCoordinator> context={(*coordinator).clone()}>
            <nav class="site-nav">
                <PreloadLink to="/courses" hover_delay_ms={delay}>{ "الدورات" }</PreloadLink>
                <PreloadLink to="/dashboard/student" hover_delay_ms={delay}>{ "لوحة الطالب" }</PreloadLink>
                <PreloadLink to="/dashboard/instructor" hover_delay_ms={delay}>{ "لوحة المدرب" }</PreloadLink>
                <PreloadLink to="/features" hover_delay_ms={delay}>{ "المميزات" }</PreloadLink>
                <PreloadLink to="/guide" hover_delay_ms={delay}>{ "دليل المنصة" }</PreloadLink>
                <PreloadStatusBadge
                    coordinator={(*coordinator).clone()}
                    poll_ms={props.config.status_poll_ms}
                />
            </nav>
            <main>
                <PreloadOnVisible path="/trust">
                    <section class="trust-badges" />
                </PreloadOnVisible>
                <PreloadOnVisible path="/community">
                    <section class="community" />
                </PreloadOnVisible>
            </main>
            if cfg!(debug_assertions) {
                <PreloadStatusPanel coordinator={(*coordinator).clone()} />
            }
        </ContextProvider<PreloadCoordinator>>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    logging::init(LogConfig::from_environment());

    let config = web::host_config();
    configure_class_cache(config.class_cache_capacity);

    yew::Renderer::<App>::with_props(AppProps {
        config: Rc::new(config),
    })
    .render();
}
