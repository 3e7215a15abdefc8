// src/main.rs
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use moviescrape::app::{MovieScraperApp, APP_TITLE};
use moviescrape::config::load_config;

fn pick_renderer() -> eframe::Renderer {
    match env::var("MOVIESCRAPE_RENDERER").as_deref() {
        Ok("glow") => eframe::Renderer::Glow,
        Ok("wgpu") => eframe::Renderer::Wgpu,
        _ => {
            // Default: Windows = WGPU (DX12), Others = Glow (GL)
            #[cfg(target_os = "windows")]
            { eframe::Renderer::Wgpu }
            #[cfg(not(target_os = "windows"))]
            { eframe::Renderer::Glow }
        }
    }
}

fn main() -> eframe::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    #[cfg(target_os = "linux")]
    {
        info!("XDG_SESSION_TYPE={:?}", env::var_os("XDG_SESSION_TYPE"));
        info!("WAYLAND_DISPLAY={:?}", env::var_os("WAYLAND_DISPLAY"));
        info!("DISPLAY={:?}", env::var_os("DISPLAY"));
    }

    let cfg = load_config();
    info!(
        "base url {}, {} image workers, {}s image timeout",
        cfg.base_url, cfg.image_workers, cfg.image_timeout_secs
    );

    let options = eframe::NativeOptions {
        renderer: pick_renderer(),
        multisampling: 0,
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };

    match eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| {
            let app = MovieScraperApp::new(&cc.egui_ctx, cfg)?;
            Ok(Box::new(app))
        }),
    ) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("eframe failed to start: {e:?}");
            error!("Hint: try MOVIESCRAPE_RENDERER=wgpu or glow.");
            Err(e)
        }
    }
}
