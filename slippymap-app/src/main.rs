use slippymap::prelude::*;

const OSM_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Headless map session: opens a view, pans and zooms it, and reports what
/// the tile layer did along the way.
///
/// Usage: `slippymap-app [lat] [lng] [zoom]`
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let (center, zoom) = parse_args()?;

    let mut map = Map::new(MapOptions::default().with_size(1200.0, 800.0))?;
    map.on(|event| log::debug!("map event: {:?}", event));

    let config = TileLayerConfig {
        max_zoom: 19,
        reuse_tiles: true,
        attribution: Some("© OpenStreetMap contributors".to_string()),
        ..Default::default()
    };
    let mut layer = TileLayer::from_config(OSM_TEMPLATE, config, Box::new(HttpTileFetcher::new()?))?;
    layer.on(|event| match event {
        TileEvent::TileError { key, error, .. } => log::warn!("tile {} failed: {}", key, error),
        TileEvent::Load => log::info!("all requested tiles settled"),
        _ => {}
    });
    let id = map.add_layer(layer)?;

    map.set_view(center, zoom)?;
    wait_for_tiles(&mut map, id).await?;
    report(&map, id, "initial view");

    map.pan_by(&Point::new(600.0, 0.0))?;
    wait_for_tiles(&mut map, id).await?;
    report(&map, id, "after panning east");

    map.zoom_in()?;
    wait_for_tiles(&mut map, id).await?;
    report(&map, id, "after zooming in");

    Ok(())
}

fn parse_args() -> Result<(LatLng, i32)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let number = |index: usize, default: f64| -> Result<f64> {
        match args.get(index) {
            Some(raw) => raw
                .parse()
                .map_err(|_| MapError::InvalidOptions(format!("not a number: {}", raw))),
            None => Ok(default),
        }
    };

    let center = LatLng::new(number(0, 37.7749)?, number(1, -122.4194)?)?;
    let zoom = number(2, 12.0)? as i32;
    Ok((center, zoom))
}

/// Pumps completions and deferred updates until the layer has nothing in
/// flight, or gives up after a while.
async fn wait_for_tiles(map: &mut Map, id: LayerId) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(20);
    loop {
        map.process_completions();
        map.tick()?;

        let loading = map.layer(id).map(|layer| layer.is_loading()).unwrap_or(false);
        if !loading {
            return Ok(());
        }
        if Instant::now() >= deadline {
            log::warn!("giving up on tiles still in flight");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn report(map: &Map, id: LayerId, label: &str) {
    let Some(layer) = map.layer(id) else {
        return;
    };
    let loaded = layer
        .tiles()
        .filter(|tile| tile.state == TileState::Loaded)
        .count();

    println!(
        "{}: zoom {}, center {}, {} tiles ({} loaded), {} pooled surfaces",
        label,
        map.get_zoom(),
        map.get_center()
            .map(|c| c.to_string())
            .unwrap_or_else(|_| "-".to_string()),
        layer.tile_count(),
        loaded,
        layer.pool_len(),
    );
    if let Some(attribution) = layer.attribution() {
        println!("  {}", attribution);
    }
}
