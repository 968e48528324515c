//! Repository URL layout.
//!
//! ```text
//! {base}GHS_POP_GLOBE_R2023A/GHS_POP_E2020_GLOBE_R2023A_54009_1000/V1-0/
//!     GHS_POP_E2020_GLOBE_R2023A_54009_1000_V1_0.zip             (global file)
//!     tiles/GHS_POP_E2020_GLOBE_R2023A_54009_1000_V1_0_R3_C19.zip (one tile)
//! ```

use anyhow::{Context, Result};

use super::ProductSpec;
use crate::tiles::TileRef;

/// Parse the configured base URL and make sure it ends with `/` so folder names can be appended.
pub fn normalize_base_url(base: &str) -> Result<String> {
    let mut parsed =
        url::Url::parse(base.trim()).with_context(|| format!("invalid base URL: {}", base))?;
    if !matches!(parsed.scheme(), "http" | "https" | "ftp") {
        anyhow::bail!("unsupported base URL scheme: {}", parsed.scheme());
    }
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed.to_string())
}

/// URL of the global file or of one tile. `base` must end with `/` (see `normalize_base_url`).
pub fn build_tile_url(base: &str, spec: &ProductSpec, tile: &TileRef) -> String {
    let product = spec.product;
    let dataset = spec.dataset_name();
    let version = product.version();
    let (tiles_dir, tile_suffix) = match tile {
        TileRef::Global => (String::new(), String::new()),
        TileRef::Tile(id) => ("tiles/".to_string(), format!("_{}", id)),
    };
    format!(
        "{base}GHS_{product}_GLOBE_{release}/{dataset}/{version}/{tiles_dir}{dataset}_{file_version}{tile_suffix}.zip",
        release = product.release(),
        file_version = version.replace('-', "_"),
    )
}

/// Local archive name for a tile, e.g. `POP_2020_54009_1000_R3_C19.zip`.
pub fn archive_name(spec: &ProductSpec, tile: &TileRef) -> String {
    format!("{}_{}.zip", spec.key(), tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Crs, Product, Resolution};
    use crate::tiles::TileId;

    const BASE: &str = "https://jeodpp.jrc.ec.europa.eu/ftp/jrc-opendata/GHSL/";

    fn spec(product: Product, epoch: u16, crs: Crs, resolution: Resolution) -> ProductSpec {
        ProductSpec {
            product,
            epoch,
            crs,
            resolution,
        }
    }

    #[test]
    fn global_pop_mollweide() {
        let url = build_tile_url(
            BASE,
            &spec(Product::Pop, 2020, Crs::Mollweide, Resolution::M1000),
            &TileRef::Global,
        );
        assert_eq!(
            url,
            "https://jeodpp.jrc.ec.europa.eu/ftp/jrc-opendata/GHSL/\
             GHS_POP_GLOBE_R2023A/GHS_POP_E2020_GLOBE_R2023A_54009_1000/V1-0/\
             GHS_POP_E2020_GLOBE_R2023A_54009_1000_V1_0.zip"
        );
    }

    #[test]
    fn tile_built_s_wgs84_uses_arc_seconds() {
        let url = build_tile_url(
            BASE,
            &spec(Product::BuiltS, 1990, Crs::Wgs84, Resolution::M100),
            &TileRef::Tile(TileId::new(3, 19).unwrap()),
        );
        assert_eq!(
            url,
            "https://jeodpp.jrc.ec.europa.eu/ftp/jrc-opendata/GHSL/\
             GHS_BUILT_S_GLOBE_R2023A/GHS_BUILT_S_E1990_GLOBE_R2023A_4326_3ss/V1-0/\
             tiles/GHS_BUILT_S_E1990_GLOBE_R2023A_4326_3ss_V1_0_R3_C19.zip"
        );
    }

    #[test]
    fn smod_uses_version_2_and_land_release_2022a() {
        let smod = build_tile_url(
            BASE,
            &spec(Product::Smod, 2030, Crs::Mollweide, Resolution::M1000),
            &TileRef::Global,
        );
        assert!(smod.ends_with(
            "GHS_SMOD_GLOBE_R2023A/GHS_SMOD_E2030_GLOBE_R2023A_54009_1000/V2-0/\
             GHS_SMOD_E2030_GLOBE_R2023A_54009_1000_V2_0.zip"
        ));

        let land = build_tile_url(
            BASE,
            &spec(Product::Land, 2018, Crs::Mollweide, Resolution::M100),
            &TileRef::Tile(TileId::new(10, 2).unwrap()),
        );
        assert!(land.ends_with(
            "GHS_LAND_GLOBE_R2022A/GHS_LAND_E2018_GLOBE_R2022A_54009_100/V1-0/\
             tiles/GHS_LAND_E2018_GLOBE_R2022A_54009_100_V1_0_R10_C2.zip"
        ));
    }

    #[test]
    fn normalize_adds_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://127.0.0.1:8080/mirror").unwrap(),
            "http://127.0.0.1:8080/mirror/"
        );
        assert_eq!(normalize_base_url(BASE).unwrap(), BASE);
        assert!(normalize_base_url("file:///tmp/ghsl").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn archive_names() {
        let s = spec(Product::Pop, 2020, Crs::Mollweide, Resolution::M1000);
        assert_eq!(archive_name(&s, &TileRef::Global), "POP_2020_54009_1000_global.zip");
        assert_eq!(
            archive_name(&s, &TileRef::Tile(TileId::new(1, 36).unwrap())),
            "POP_2020_54009_1000_R1_C36.zip"
        );
    }
}
