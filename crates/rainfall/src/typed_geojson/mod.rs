//! Typed view over rain-area GeoJSON, for consumers that want band labels
//! as a struct instead of a raw property map.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use serde::{de::DeserializeOwned, Serialize};
use geojson::{Geometry, JsonObject};
use ts_rs::TS;
use schemars::JsonSchema;

use crate::error::Result;

/// Properties carried by every rain-area feature
#[derive(Serialize, serde::Deserialize, Debug, Clone, PartialEq, TS, JsonSchema)]
#[ts(export)]
#[schemars(description = "Properties for rain area features")]
pub struct RainAreaProperties {
    #[schemars(description = "Name of the intensity band the pixel matched")]
    pub intensity: String,
}

/// A rain-area FeatureCollection with typed properties
pub type RainAreaGeoJson = TypedFeatureCollection<RainAreaProperties>;

/// A GeoJSON Feature whose properties deserialize into `P`
#[derive(Serialize, Debug, Clone)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    P: Serialize + DeserializeOwned,
{
    pub fn new(geometry: Geometry, properties: &P) -> Result<Self> {
        let properties = match serde_json::to_value(properties)? {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        Ok(Self {
            feature: geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties,
                foreign_members: None,
            },
            _properties: PhantomData,
        })
    }

    /// `None` when the stored properties do not match `P`
    pub fn properties(&self) -> Option<P> {
        let map = self.feature.properties.clone()?;
        serde_json::from_value(serde_json::Value::Object(map)).ok()
    }
}

/// Serializes as a GeoJSON FeatureCollection with its foreign members inlined
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct TypedFeatureCollection<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    #[serde(flatten)]
    pub foreign_members: JsonObject,
}

impl<P> TypedFeatureCollection<P>
where
    P: Serialize + DeserializeOwned,
{
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Decoded properties of every feature, skipping ones that do not match `P`
    pub fn properties(&self) -> impl Iterator<Item = P> + '_ {
        self.features.iter().filter_map(TypedFeature::properties)
    }
}

impl RainAreaGeoJson {
    /// Features labelled with the given intensity
    pub fn features_with_intensity(&self, intensity: &str) -> Vec<&TypedFeature<RainAreaProperties>> {
        self.features
            .iter()
            .filter(|feature| feature.properties().is_some_and(|p| p.intensity == intensity))
            .collect()
    }

    /// Feature count per intensity label
    pub fn intensity_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for props in self.properties() {
            *counts.entry(props.intensity).or_insert(0) += 1;
        }
        counts
    }

    /// Source image size recorded in the collection metadata
    pub fn image_dimensions(&self) -> Option<(u32, u32)> {
        let dimension = |name: &str| {
            self.foreign_members
                .get(name)?
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
        };
        Some((dimension("image_width")?, dimension("image_height")?))
    }
}
