use std::path::Path;

use geo_types::{Coord, LineString, Polygon};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use crate::{
    error::{RainfallError, Result},
    io::write_atomically,
    typed_geojson::{RainAreaGeoJson, RainAreaProperties, TypedFeature, TypedFeatureCollection},
    types::{RainAreaCollection, RainAreaFeature},
};

/// Property holding the band label on every feature
pub const INTENSITY_PROPERTY: &str = "intensity";

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    // geo-types keeps rings closed, which is what GeoJSON requires
    vec![polygon.exterior().coords().map(|c| vec![c.x, c.y]).collect()]
}

impl RainAreaCollection {
    fn foreign_members(&self) -> JsonObject {
        let mut foreign_members = JsonObject::new();
        foreign_members.insert("image_width".to_string(), serde_json::Value::from(self.image_width));
        foreign_members.insert("image_height".to_string(), serde_json::Value::from(self.image_height));
        foreign_members.insert("feature_count".to_string(), serde_json::Value::from(self.features.len()));
        if let Some(source) = &self.source_image {
            foreign_members.insert("source_image".to_string(), serde_json::Value::from(source.clone()));
        }
        foreign_members
    }

    fn geojson_bbox(&self) -> Option<Vec<f64>> {
        self.bounding_rect()
            .map(|rect| vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y])
    }

    /// Typed view with decoded `RainAreaProperties`
    pub fn to_typed_geojson(&self) -> Result<RainAreaGeoJson> {
        let features = self
            .features
            .iter()
            .map(|feature| {
                let geometry = Geometry::new(Value::Polygon(polygon_rings(&feature.geometry)));
                let properties = RainAreaProperties {
                    intensity: feature.intensity.clone(),
                };
                TypedFeature::new(geometry, &properties)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TypedFeatureCollection {
            bbox: self.geojson_bbox(),
            features,
            foreign_members: self.foreign_members(),
        })
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let mut properties = JsonObject::new();
                properties.insert(
                    INTENSITY_PROPERTY.to_string(),
                    serde_json::Value::String(feature.intensity.clone()),
                );

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Polygon(polygon_rings(&feature.geometry)))),
                    id: Some(Id::Number(serde_json::Number::from(i))),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: self.geojson_bbox(),
            features,
            foreign_members: Some(self.foreign_members()),
        }
    }

    /// Compact JSON: an artifact carries one polygon per matching pixel
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_geojson())?)
    }

    /// Save GeoJSON to file; the file appears complete or not at all
    pub fn save_geojson(&self, path: &Path) -> Result<()> {
        let geojson_string = self
            .to_geojson_string()
            .map_err(|e| RainfallError::persistence(path, e))?;
        write_atomically(path, geojson_string.as_bytes())
    }

    /// Load a collection back from a GeoJSON artifact
    pub fn from_geojson_file(path: &Path) -> Result<Self> {
        let geojson_str = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&geojson_str)
    }

    pub fn from_geojson_str(geojson_str: &str) -> Result<Self> {
        let geojson: FeatureCollection = geojson_str.parse()?;

        let foreign_members = geojson
            .foreign_members
            .as_ref()
            .ok_or_else(|| RainfallError::InvalidArtifact("missing image metadata".to_string()))?;

        let dimension = |name: &str| {
            foreign_members
                .get(name)
                .and_then(|v| v.as_u64())
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| RainfallError::InvalidArtifact(format!("missing or invalid {}", name)))
        };
        let image_width = dimension("image_width")?;
        let image_height = dimension("image_height")?;
        let source_image = foreign_members
            .get("source_image")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let mut features = Vec::with_capacity(geojson.features.len());
        for (i, feature) in geojson.features.into_iter().enumerate() {
            let intensity = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(INTENSITY_PROPERTY))
                .and_then(|v| v.as_str())
                .ok_or_else(|| RainfallError::InvalidArtifact(format!("feature {} has no intensity", i)))?
                .to_string();

            let rings = match feature.geometry.map(|g| g.value) {
                Some(Value::Polygon(rings)) if !rings.is_empty() => rings,
                _ => {
                    return Err(RainfallError::InvalidArtifact(format!(
                        "feature {} is not a polygon",
                        i
                    )));
                }
            };

            let exterior: Vec<Coord<f64>> = rings[0]
                .iter()
                .filter(|position| position.len() >= 2)
                .map(|position| Coord { x: position[0], y: position[1] })
                .collect();

            features.push(RainAreaFeature {
                geometry: Polygon::new(LineString::new(exterior), vec![]),
                intensity,
            });
        }

        Ok(RainAreaCollection {
            features,
            image_width,
            image_height,
            source_image,
        })
    }
}
