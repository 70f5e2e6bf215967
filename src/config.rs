use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_address_column")]
    pub address_column: String,
    #[serde(default = "default_phone_column")]
    pub phone_column: String,
    #[serde(default = "default_items_column")]
    pub items_column: String,
    #[serde(default = "default_latitude_column")]
    pub latitude_column: String,
    #[serde(default = "default_longitude_column")]
    pub longitude_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    #[serde(default = "default_max_selected")]
    pub max_selected: usize,
    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize, // checkbox grid width
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_tile_url")]
    pub tile_url: String,
    #[serde(default = "default_attribution")]
    pub attribution: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_name_column() -> String { "병원명".to_string() }
fn default_address_column() -> String { "주소".to_string() }
fn default_phone_column() -> String { "전화번호".to_string() }
fn default_items_column() -> String { "수거약품목".to_string() }
fn default_latitude_column() -> String { "위도".to_string() }
fn default_longitude_column() -> String { "경도".to_string() }

fn default_max_selected() -> usize { 3 }
fn default_grid_columns() -> usize { 3 }

fn default_tile_url() -> String {
    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}
fn default_attribution() -> String {
    "&copy; OpenStreetMap contributors".to_string()
}
fn default_zoom() -> u8 { 13 }

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }

fn default_title() -> String { "♥ 폐의약품 수거 약국 찾기".to_string() }
fn default_description() -> String {
    "원하는 폐의약품을 선택하면 해당 약국을 표와 지도에서 확인할 수 있어요!".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { max_selected: default_max_selected(), grid_columns: default_grid_columns() }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self { tile_url: default_tile_url(), attribution: default_attribution(), zoom: default_zoom() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self { title: default_title(), description: default_description() }
    }
}

impl InputConfig {
    /// Column layout of the bundled dataset, reading from `data_csv`.
    #[cfg(test)]
    pub fn with_defaults(data_csv: PathBuf) -> Self {
        Self {
            data_csv,
            name_column: default_name_column(),
            address_column: default_address_column(),
            phone_column: default_phone_column(),
            items_column: default_items_column(),
            latitude_column: default_latitude_column(),
            longitude_column: default_longitude_column(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        if config.selection.max_selected == 0 {
            anyhow::bail!("selection.max_selected must be at least 1");
        }
        Ok(config)
    }

    /// Config with every optional section defaulted.
    #[cfg(test)]
    pub fn for_dataset(data_csv: PathBuf) -> Self {
        Self {
            input: InputConfig::with_defaults(data_csv),
            selection: SelectionConfig::default(),
            map: MapConfig::default(),
            server: ServerConfig::default(),
            page: PageConfig::default(),
        }
    }
}
