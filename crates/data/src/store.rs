use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gotham_core::{AttractionRecord, CleanedDatasets, HotelRecord, RestaurantRecord};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;

pub const HOTELS_FILE: &str = "nyc_hotel_encoded.csv";
pub const ATTRACTIONS_FILE: &str = "nyc_attractions.csv";
pub const RESTAURANTS_FILE: &str = "nyc_restaurants.csv";
pub const DEFAULT_DATA_DIR: &str = "cleaned_data";

pub trait DatasetRepository: Send + Sync {
    fn load_hotels(&self) -> Result<Vec<HotelRecord>, StoreError>;
    fn load_attractions(&self) -> Result<Vec<AttractionRecord>, StoreError>;
    fn load_restaurants(&self) -> Result<Vec<RestaurantRecord>, StoreError>;

    fn save_hotels(&self, records: &[HotelRecord]) -> Result<(), StoreError>;
    fn save_attractions(&self, records: &[AttractionRecord]) -> Result<(), StoreError>;
    fn save_restaurants(&self, records: &[RestaurantRecord]) -> Result<(), StoreError>;

    fn load_all(&self) -> Result<CleanedDatasets, StoreError> {
        Ok(CleanedDatasets {
            hotels: self.load_hotels()?,
            attractions: self.load_attractions()?,
            restaurants: self.load_restaurants()?,
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    datasets: Arc<RwLock<CleanedDatasets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_datasets(datasets: CleanedDatasets) -> Self {
        Self {
            datasets: Arc::new(RwLock::new(datasets)),
        }
    }
}

impl DatasetRepository for MemoryStore {
    fn load_hotels(&self) -> Result<Vec<HotelRecord>, StoreError> {
        Ok(self.datasets.read().hotels.clone())
    }

    fn load_attractions(&self) -> Result<Vec<AttractionRecord>, StoreError> {
        Ok(self.datasets.read().attractions.clone())
    }

    fn load_restaurants(&self) -> Result<Vec<RestaurantRecord>, StoreError> {
        Ok(self.datasets.read().restaurants.clone())
    }

    fn save_hotels(&self, records: &[HotelRecord]) -> Result<(), StoreError> {
        self.datasets.write().hotels = records.to_vec();
        Ok(())
    }

    fn save_attractions(&self, records: &[AttractionRecord]) -> Result<(), StoreError> {
        self.datasets.write().attractions = records.to_vec();
        Ok(())
    }

    fn save_restaurants(&self, records: &[RestaurantRecord]) -> Result<(), StoreError> {
        self.datasets.write().restaurants = records.to_vec();
        Ok(())
    }
}

/// Cleaned datasets as CSV files in one directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.path_for(file);
        if !path.exists() {
            return Err(StoreError::Missing(path));
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), rows = records.len(), "cleaned dataset loaded");
        Ok(records)
    }

    fn write<T: Serialize>(&self, file: &str, records: &[T]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(file);
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(write_err)?;
        for record in records {
            writer.serialize(record).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|source| write_err(csv::Error::from(source)))?;

        debug!(path = %path.display(), rows = records.len(), "cleaned dataset written");
        Ok(())
    }
}

impl DatasetRepository for CsvStore {
    fn load_hotels(&self) -> Result<Vec<HotelRecord>, StoreError> {
        self.read(HOTELS_FILE)
    }

    fn load_attractions(&self) -> Result<Vec<AttractionRecord>, StoreError> {
        self.read(ATTRACTIONS_FILE)
    }

    fn load_restaurants(&self) -> Result<Vec<RestaurantRecord>, StoreError> {
        self.read(RESTAURANTS_FILE)
    }

    fn save_hotels(&self, records: &[HotelRecord]) -> Result<(), StoreError> {
        self.write(HOTELS_FILE, records)
    }

    fn save_attractions(&self, records: &[AttractionRecord]) -> Result<(), StoreError> {
        self.write(ATTRACTIONS_FILE, records)
    }

    fn save_restaurants(&self, records: &[RestaurantRecord]) -> Result<(), StoreError> {
        self.write(RESTAURANTS_FILE, records)
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Csv(CsvStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn csv(dir: impl Into<PathBuf>) -> Self {
        Self::Csv(CsvStore::new(dir))
    }
}

impl DatasetRepository for Store {
    fn load_hotels(&self) -> Result<Vec<HotelRecord>, StoreError> {
        match self {
            Store::Memory(store) => store.load_hotels(),
            Store::Csv(store) => store.load_hotels(),
        }
    }

    fn load_attractions(&self) -> Result<Vec<AttractionRecord>, StoreError> {
        match self {
            Store::Memory(store) => store.load_attractions(),
            Store::Csv(store) => store.load_attractions(),
        }
    }

    fn load_restaurants(&self) -> Result<Vec<RestaurantRecord>, StoreError> {
        match self {
            Store::Memory(store) => store.load_restaurants(),
            Store::Csv(store) => store.load_restaurants(),
        }
    }

    fn save_hotels(&self, records: &[HotelRecord]) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.save_hotels(records),
            Store::Csv(store) => store.save_hotels(records),
        }
    }

    fn save_attractions(&self, records: &[AttractionRecord]) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.save_attractions(records),
            Store::Csv(store) => store.save_attractions(records),
        }
    }

    fn save_restaurants(&self, records: &[RestaurantRecord]) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.save_restaurants(records),
            Store::Csv(store) => store.save_restaurants(records),
        }
    }
}
