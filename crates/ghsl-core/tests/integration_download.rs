//! Integration tests: local archive server → `download_ghsl`.
//!
//! The server publishes zip archives at the real repository layout; the
//! pipeline fetches, caches, stages and writes them without GDAL (single
//! uncropped tiles or `--no-merge`). GDAL builds rewrite every output, which
//! the placeholder rasters here cannot survive.
#![cfg(not(feature = "gdal"))]

mod common;

use std::path::{Path, PathBuf};

use ghsl_core::cache_db::{CacheDb, EntryState};
use ghsl_core::config::{CacheConfig, GhslConfig, RetryConfig};
use ghsl_core::pipeline::{download_ghsl, PipelineContext};
use ghsl_core::product::{build_tile_url, Crs, Product, ProductSpec, Resolution};
use ghsl_core::request::{DownloadRequest, Extent};
use ghsl_core::tiles::{BBox, TileIndex, TileRef};
use tempfile::tempdir;

const POP_TIF: &[u8] = b"II*\0pretend-population-raster";

fn pop_2020() -> ProductSpec {
    ProductSpec {
        product: Product::Pop,
        epoch: 2020,
        crs: Crs::Mollweide,
        resolution: Resolution::M1000,
    }
}

fn archive(tif_name: &str, tif: &[u8]) -> Vec<u8> {
    common::zip_bytes(&[("GHSL_Data_Package.pdf", b"%PDF-1.4"), (tif_name, tif)])
}

fn config(base_url: &str, archives: &Path) -> GhslConfig {
    GhslConfig {
        base_url: base_url.to_string(),
        max_parallel_downloads: 2,
        cache: Some(CacheConfig {
            enabled: true,
            dir: Some(archives.to_path_buf()),
            verify_on_reuse: true,
            revalidate_remote: false,
        }),
        retry: Some(RetryConfig {
            max_attempts: 3,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        }),
        ..GhslConfig::default()
    }
}

fn pop_request(out: &Path) -> DownloadRequest {
    let mut r = DownloadRequest::new(out);
    r.products = vec![Product::Pop];
    r.prefix = "city_".to_string();
    r
}

#[tokio::test]
async fn global_download_then_served_from_cache() {
    let server = common::archive_server::start();
    let url = build_tile_url(&server.base_url, &pop_2020(), &TileRef::Global);
    server.publish(
        &url,
        archive("GHS_POP_E2020_GLOBE_R2023A_54009_1000_V1_0.tif", POP_TIF),
    );

    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let db = CacheDb::open_at(state.path().join("cache.db")).await.unwrap();
    let cfg = config(&server.base_url, &state.path().join("archives"));
    let ctx = PipelineContext::new(cfg, Some(db.clone()), None).unwrap();
    let request = pop_request(out.path());

    let report = download_ghsl(&request, &ctx).await.expect("first run");
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.from_cache, 0);
    assert_eq!(report.outputs.len(), 1);
    let expected = out.path().join("city_POP_2020_54009_1000.tif");
    assert_eq!(report.outputs[0].dataset.path(), expected.as_path());
    assert_eq!(report.outputs[0].key, "POP_2020_54009_1000");
    assert!(report.outputs[0].dataset.is_valid());
    assert_eq!(std::fs::read(&expected).unwrap(), POP_TIF);
    assert!(!out.path().join("POP_2020_54009_1000").exists(), "work dir removed");

    let entries = db.list_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].state, EntryState::Complete);
    assert_eq!(entries[0].url, url);
    assert!(entries[0].archive_path.is_file(), "archive kept in cache");

    let gets_before = server.gets().len();
    std::fs::remove_file(&expected).unwrap();
    let report = download_ghsl(&request, &ctx).await.expect("second run");
    assert_eq!(report.downloaded, 0);
    assert_eq!(report.from_cache, 1);
    assert_eq!(server.gets().len(), gets_before, "no GET on cache hit");
    assert_eq!(std::fs::read(&expected).unwrap(), POP_TIF);
}

#[tokio::test]
async fn corrupted_cache_entry_is_downloaded_again() {
    let server = common::archive_server::start();
    let url = build_tile_url(&server.base_url, &pop_2020(), &TileRef::Global);
    server.publish(&url, archive("pop.tif", POP_TIF));

    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let db = CacheDb::open_at(state.path().join("cache.db")).await.unwrap();
    let cfg = config(&server.base_url, &state.path().join("archives"));
    let ctx = PipelineContext::new(cfg, Some(db.clone()), None).unwrap();
    let request = pop_request(out.path());

    download_ghsl(&request, &ctx).await.unwrap();
    let cached = db.find_by_url(&url).await.unwrap().unwrap().archive_path;
    std::fs::write(&cached, b"bit rot").unwrap();

    let report = download_ghsl(&request, &ctx).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.from_cache, 0);
    let entry = db.find_by_url(&url).await.unwrap().unwrap();
    assert_eq!(entry.state, EntryState::Complete);
    assert_eq!(
        std::fs::read(out.path().join("city_POP_2020_54009_1000.tif")).unwrap(),
        POP_TIF
    );
}

#[tokio::test]
async fn interrupted_transfer_resumes_with_range() {
    let server = common::archive_server::start_with_options(common::archive_server::ServerOptions {
        cut_first_get_at: Some(100),
        ..Default::default()
    });
    let url = build_tile_url(&server.base_url, &pop_2020(), &TileRef::Global);
    let padding = vec![7u8; 4096];
    let body = archive("pop.tif", &padding);
    server.publish(&url, body.clone());

    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let db = CacheDb::open_at(state.path().join("cache.db")).await.unwrap();
    let cfg = config(&server.base_url, &state.path().join("archives"));
    let ctx = PipelineContext::new(cfg, Some(db.clone()), None).unwrap();

    let report = download_ghsl(&pop_request(out.path()), &ctx).await.unwrap();
    assert_eq!(report.downloaded, 1);

    let gets = server.gets();
    assert_eq!(gets.len(), 2);
    assert_eq!(gets[0].range_start, None);
    assert_eq!(gets[1].range_start, Some(100));

    let entry = db.find_by_url(&url).await.unwrap().unwrap();
    assert_eq!(std::fs::read(&entry.archive_path).unwrap(), body);
    assert_eq!(entry.total_size, Some(body.len() as i64));
}

#[tokio::test]
async fn without_cache_archives_are_not_kept() {
    let server = common::archive_server::start();
    let url = build_tile_url(&server.base_url, &pop_2020(), &TileRef::Global);
    server.publish(&url, archive("pop.tif", POP_TIF));

    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let archives = state.path().join("archives");
    let ctx = PipelineContext::new(config(&server.base_url, &archives), None, None).unwrap();

    let report = download_ghsl(&pop_request(out.path()), &ctx).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert!(!archives.exists());
    let names: Vec<PathBuf> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| PathBuf::from(e.unwrap().file_name()))
        .collect();
    assert_eq!(names, vec![PathBuf::from("city_POP_2020_54009_1000.tif")]);
}

#[tokio::test]
async fn bbox_without_index_skips_unpublished_tiles() {
    let server = common::archive_server::start();
    let published: TileRef = "R4_C19".parse().unwrap();
    let url = build_tile_url(&server.base_url, &pop_2020(), &published);
    server.publish(
        &url,
        archive("GHS_POP_E2020_GLOBE_R2023A_54009_1000_V1_0_R4_C19.tif", POP_TIF),
    );

    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let db = CacheDb::open_at(state.path().join("cache.db")).await.unwrap();
    let ctx = PipelineContext::new(
        config(&server.base_url, &state.path().join("archives")),
        Some(db.clone()),
        None,
    )
    .unwrap();

    let mut request = pop_request(out.path());
    request.extent = Extent::BBox(BBox::new(900_000.0, 5_800_000.0, 1_000_000.0, 5_950_000.0).unwrap());
    request.merge = false;

    let report = download_ghsl(&request, &ctx).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].tile, Some(published));
    assert_eq!(
        report.outputs[0].dataset.path(),
        out.path()
            .join("city_POP_2020_54009_1000_tiles")
            .join("GHS_POP_E2020_GLOBE_R2023A_54009_1000_V1_0_R4_C19.tif")
    );
    // Only the published tile gets a cache row.
    assert_eq!(db.list_entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn explicit_missing_tile_is_an_error() {
    let server = common::archive_server::start();
    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let ctx = PipelineContext::new(
        config(&server.base_url, &state.path().join("archives")),
        None,
        None,
    )
    .unwrap();

    let mut request = pop_request(out.path());
    request.extent = Extent::Tiles(vec!["R1_C1".parse().unwrap()]);
    let err = download_ghsl(&request, &ctx).await.unwrap_err();
    assert!(format!("{:#}", err).contains("no archive published"));
}

#[tokio::test]
async fn regions_write_one_file_per_region() {
    let server = common::archive_server::start();
    let index = TileIndex::from_geojson(
        r#"{"features":[
            {"properties":{"tile_id":"R4_C19","region":"W_EUR"},"geometry":{"coordinates":[[-41000,5000000],[959000,6000000]]}},
            {"properties":{"tile_id":"R5_C8","region":"W_AME"},"geometry":{"coordinates":[[-11041000,4000000],[-10041000,5000000]]}}
        ]}"#,
    )
    .unwrap();
    let europe: TileRef = "R4_C19".parse().unwrap();
    let america: TileRef = "R5_C8".parse().unwrap();
    server.publish(
        &build_tile_url(&server.base_url, &pop_2020(), &europe),
        archive("eur.tif", b"II*\0europe"),
    );
    server.publish(
        &build_tile_url(&server.base_url, &pop_2020(), &america),
        archive("ame.tif", b"II*\0america"),
    );

    let out = tempdir().unwrap();
    let state = tempdir().unwrap();
    let ctx = PipelineContext::new(
        config(&server.base_url, &state.path().join("archives")),
        None,
        Some(index),
    )
    .unwrap();
    let mut request = pop_request(out.path());
    request.extent = Extent::Regions;

    let report = download_ghsl(&request, &ctx).await.unwrap();
    assert_eq!(report.downloaded, 2);
    assert_eq!(report.outputs.len(), 2);

    let mut by_region: Vec<(String, PathBuf)> = report
        .outputs
        .iter()
        .map(|o| {
            assert!(o.tile.is_none());
            (o.region.clone().unwrap(), o.dataset.path().to_path_buf())
        })
        .collect();
    by_region.sort();
    assert_eq!(
        by_region,
        vec![
            (
                "W_AME".to_string(),
                out.path().join("W_AME_city_POP_2020_54009_1000.tif")
            ),
            (
                "W_EUR".to_string(),
                out.path().join("W_EUR_city_POP_2020_54009_1000.tif")
            ),
        ]
    );
    assert_eq!(std::fs::read(&by_region[0].1).unwrap(), b"II*\0america");
    assert_eq!(std::fs::read(&by_region[1].1).unwrap(), b"II*\0europe");
    assert!(!out.path().join("POP_2020_54009_1000").exists());
}
