use std::fs;

use gotham_core::{Borough, BudgetTier};
use gotham_data::{
    generate_datasets, BoundaryCrs, CleanError, CsvStore, DatasetRepository, LoadError,
    StoreError,
};
use gotham_data::store::{ATTRACTIONS_FILE, HOTELS_FILE, RESTAURANTS_FILE};
use gotham_tests::write_sources;

#[test]
fn cleans_tags_and_persists_all_three_datasets() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = write_sources(raw.path());
    let store = CsvStore::new(out.path().join("cleaned_data"));

    let summary = generate_datasets(&paths, None, &store).unwrap();
    assert_eq!(summary.boundary_crs, BoundaryCrs::Wgs84);
    assert_eq!(summary.boundaries, 2);

    let hotels = &summary.reports[0];
    assert_eq!((hotels.rows_read, hotels.kept), (6, 4));
    assert_eq!((hotels.duplicates, hotels.invalid), (1, 1));
    assert_eq!(hotels.unknown_borough, 1);

    let attractions = &summary.reports[1];
    assert_eq!((attractions.kept, attractions.duplicates, attractions.missing_fields), (4, 1, 1));

    let restaurants = &summary.reports[2];
    assert_eq!((restaurants.kept, restaurants.missing_fields), (3, 1));
    assert_eq!(summary.rows_dropped(), 5);

    let cleaned = store.load_all().unwrap();
    let boroughs = cleaned
        .hotels
        .iter()
        .map(|hotel| (hotel.name.as_str(), hotel.borough))
        .collect::<Vec<_>>();
    assert_eq!(
        boroughs,
        vec![
            ("Harbor Inn", Borough::Brooklyn),
            ("Midtown Grand", Borough::Manhattan),
            ("Café Suites", Borough::Manhattan),
            ("Jersey Side", Borough::Unknown),
        ]
    );
    assert_eq!(cleaned.hotels[2].budget_tier, Some(BudgetTier::Low));
    assert_eq!(cleaned.attractions[1].borough, Borough::Manhattan);
    assert_eq!(cleaned.attractions[1].zipcode.as_deref(), Some("10028"));
    assert_eq!(cleaned.restaurants[2].borough, Borough::Brooklyn);
}

#[test]
fn cleaning_twice_is_byte_identical() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = write_sources(raw.path());
    let store = CsvStore::new(out.path());

    generate_datasets(&paths, None, &store).unwrap();
    let first = [HOTELS_FILE, ATTRACTIONS_FILE, RESTAURANTS_FILE]
        .map(|file| fs::read(store.path_for(file)).unwrap());

    generate_datasets(&paths, None, &store).unwrap();
    let second = [HOTELS_FILE, ATTRACTIONS_FILE, RESTAURANTS_FILE]
        .map(|file| fs::read(store.path_for(file)).unwrap());

    assert_eq!(first, second);
}

#[test]
fn boundary_file_without_name_column_is_rejected() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = write_sources(raw.path());
    let geojson = fs::read_to_string(&paths.boroughs)
        .unwrap()
        .replace("BoroName", "Shape_Area");
    fs::write(&paths.boroughs, geojson).unwrap();

    let store = CsvStore::new(out.path());
    let err = generate_datasets(&paths, None, &store).unwrap_err();
    assert!(matches!(err, CleanError::Validation { dataset: "boroughs", .. }));
    assert!(!store.path_for(HOTELS_FILE).exists());
}

#[test]
fn missing_and_unsupported_sources_surface_load_errors() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let store = CsvStore::new(out.path());

    let mut paths = write_sources(raw.path());
    paths.hotels = raw.path().join("does-not-exist.csv");
    let err = generate_datasets(&paths, None, &store).unwrap_err();
    assert!(matches!(err, CleanError::Load(LoadError::MissingFile(_))));

    let mut paths = write_sources(raw.path());
    let pdf = raw.path().join("restaurants.pdf");
    fs::write(&pdf, b"%PDF-1.7").unwrap();
    paths.restaurants = pdf;
    let err = generate_datasets(&paths, None, &store).unwrap_err();
    assert!(matches!(err, CleanError::Load(LoadError::UnsupportedFormat(_))));
}

#[test]
fn forcing_the_state_plane_crs_misses_degree_polygons() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = write_sources(raw.path());
    let store = CsvStore::new(out.path());

    let summary = generate_datasets(&paths, Some(BoundaryCrs::NyLongIsland), &store).unwrap();
    assert_eq!(summary.boundary_crs, BoundaryCrs::NyLongIsland);
    assert_eq!(summary.reports[2].unknown_borough, summary.reports[2].kept);
}

#[test]
fn planning_before_generation_names_the_missing_file() {
    let out = tempfile::tempdir().unwrap();
    let store = CsvStore::new(out.path());

    match store.load_all() {
        Err(StoreError::Missing(path)) => assert!(path.ends_with(HOTELS_FILE)),
        other => panic!("expected a missing dataset error, got {other:?}"),
    }
}
