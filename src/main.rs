use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tracing::info;

use tvgrid::browse::{BrowseController, BrowseServices, FolderContext};
use tvgrid::config::BrowseConfig;
use tvgrid::input::{Direction, InputAction};
use tvgrid::layout::grid::default_viewport_from_display;
use tvgrid::models::{
    CatalogItem, CollectionType, FolderKind, GridDirection, ImageType, ItemCategory, ItemId,
    LayoutPreferences, LibraryPreferences, PosterSize,
};
use tvgrid::services::{InMemoryCatalog, InMemoryPreferences, RecordingSink};

const DEMO_LIBRARY: &str = "demo-movies";
/// Simulated server round trip for the in-memory catalog.
const DEMO_LATENCY: Duration = Duration::from_millis(25);

/// Reads `name` and parses it, falling back to the default when unset.
fn env_or_default<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr<Err = tvgrid::BrowseError> + Default,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid {name} value {value:?}")),
        Err(_) => Ok(T::default()),
    }
}

fn display_size() -> Result<(u32, u32)> {
    let Ok(value) = env::var("TVGRID_VIEWPORT") else {
        return Ok((1920, 1080));
    };
    let (w, h) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("TVGRID_VIEWPORT must look like 1920x1080, got {value:?}"))?;
    let width = w.trim().parse().context("viewport width")?;
    let height = h.trim().parse().context("viewport height")?;
    Ok((width, height))
}

fn demo_catalog() -> Vec<CatalogItem> {
    const GENRES: &[&str] = &["Action", "Drama", "Comedy", "Sci-Fi", "Thriller"];
    const WORDS: &[&str] = &["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Mike"];
    (0..480u128)
        .map(|n| {
            let name = format!("{} {n}", WORDS[(n % WORDS.len() as u128) as usize]);
            CatalogItem::new(ItemId::from_u128(n + 1), name, ItemCategory::Movie)
                .with_runtime_minutes(80 + (n as i64 % 70))
                .with_production_year(1970 + (n % 55) as i32)
                .with_genres([GENRES[(n % GENRES.len() as u128) as usize]])
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tvgrid=info".parse().context("log directive")?),
        )
        .init();

    let layout = LayoutPreferences::new(
        env_or_default::<PosterSize>("TVGRID_POSTER_SIZE")?,
        env_or_default::<ImageType>("TVGRID_IMAGE_TYPE")?,
        env_or_default::<GridDirection>("TVGRID_DIRECTION")?,
    );
    let (width, height) = display_size()?;
    let viewport = default_viewport_from_display(width, height, 1.0);

    let catalog = Arc::new(InMemoryCatalog::new(demo_catalog()).with_latency(DEMO_LATENCY));
    let preferences = Arc::new(InMemoryPreferences::new().with_library(
        DEMO_LIBRARY,
        LibraryPreferences {
            layout,
            ..Default::default()
        },
    ));
    let sink = Arc::new(RecordingSink::new());
    let services = BrowseServices::new(catalog, preferences, Handle::current())
        .with_sink(sink.clone())
        .with_navigator(sink.clone());

    let folder = FolderContext::new(
        ItemId::from_u128(0),
        "Movies",
        FolderKind::new(ItemCategory::CollectionFolder, Some(CollectionType::Movies)),
    )
    .with_preferences_key(DEMO_LIBRARY);
    let mut controller = BrowseController::new(BrowseConfig::default(), folder, viewport, services);

    controller.start().context("failed to lay out the grid")?;
    controller.wait_idle().await;

    if let Some(geometry) = controller.geometry() {
        info!(
            width,
            height,
            card_width = geometry.card_width,
            card_height = geometry.card_height,
            lines = geometry.line_count,
            visible = geometry.estimated_visible_cards,
            "grid ready"
        );
    }
    info!(status = %controller.status_text(), counter = %controller.counter_text());

    for _ in 0..3 {
        controller.handle_input(InputAction::Move(Direction::Right));
    }
    controller.handle_input(InputAction::Confirm);
    controller.set_start_letter(Some('M'));
    controller.wait_idle().await;
    info!(status = %controller.status_text(), counter = %controller.counter_text());

    controller.detach();
    info!(opened = sink.opened().len(), "done");
    Ok(())
}
