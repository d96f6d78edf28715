//! Static asset server: configured directory mounts plus the generated hotbar page.

use std::{future::Future, net::SocketAddr};
use thiserror::Error;
use tracing::{info, warn};
use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use crate::config::{route_segments, ConfigError, ServerConfig};
use crate::hotbar::render_hotbar;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("hotbar route {0:?} has no path segments")]
    EmptyHotbarRoute(String),

    #[error("bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: warp::Error },
}

fn path_prefix(segments: &[String]) -> BoxedFilter<()> {
    segments
        .iter()
        .fold(warp::any().boxed(), |f, seg| f.and(warp::path(seg.clone())).boxed())
}

fn hotbar_filter(cfg: &ServerConfig, textures: &[String]) -> Result<BoxedFilter<(Response,)>, ServeError> {
    let segments = route_segments(&cfg.hotbar_route);
    if segments.is_empty() {
        return Err(ServeError::EmptyHotbarRoute(cfg.hotbar_route.clone()));
    }
    // Texture list is fixed for the process lifetime; render once.
    let body = render_hotbar(textures, &cfg.hotbar_src_prefix);
    Ok(warp::get()
        .and(path_prefix(&segments))
        .and(warp::path::end())
        .map(move || warp::reply::with_header(body.clone(), "content-type", "text/html").into_response())
        .boxed())
}

/// All routes, without request tracing (tests drive this directly through `warp::test`).
pub fn routes(cfg: &ServerConfig, textures: &[String]) -> Result<BoxedFilter<(Response,)>, ServeError> {
    let mut all = hotbar_filter(cfg, textures)?;
    for m in &cfg.mounts {
        let segments = m.segments();
        if segments.is_empty() {
            warn!("skipping mount with empty route {:?}", m.route);
            continue;
        }
        if !m.dir.is_dir() {
            warn!("mount /{} -> {} does not exist yet", segments.join("/"), m.dir.display());
        }
        let mount = warp::get()
            .or(warp::head())
            .unify()
            .and(path_prefix(&segments))
            .and(warp::fs::dir(m.dir.clone()))
            .map(|file: warp::fs::File| file.into_response())
            .boxed();
        all = all.or(mount).unify().boxed();
    }
    Ok(all)
}

/// Bind the configured address and return the server future, which resolves once `shutdown` does.
pub fn bind(
    cfg: &ServerConfig,
    textures: &[String],
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), ServeError> {
    let addr = cfg.socket_addr()?;
    let routes = routes(cfg, textures)?.with(warp::trace::request());
    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|source| ServeError::Bind { addr, source })?;
    for m in cfg.mounts.iter().filter(|m| !m.segments().is_empty()) {
        info!("serving {} at /{}", m.dir.display(), m.segments().join("/"));
    }
    info!("hotbar at http://{bound}/{}", route_segments(&cfg.hotbar_route).join("/"));
    Ok((bound, server))
}

/// Serve until Ctrl-C.
pub async fn serve(cfg: &ServerConfig, textures: &[String]) -> Result<(), ServeError> {
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => {
                warn!("cannot listen for ctrl-c ({e}); serving until killed");
                std::future::pending::<()>().await;
            }
        }
    };
    let (addr, server) = bind(cfg, textures, shutdown)?;
    info!("listening on {addr}");
    server.await;
    Ok(())
}
