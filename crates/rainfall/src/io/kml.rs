use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use crate::{
    error::{RainfallError, Result},
    io::{geojson::INTENSITY_PROPERTY, write_atomically},
    types::{RainAreaCollection, RainAreaFeature},
};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

type KmlWriter = Writer<Vec<u8>>;

fn kml_error(err: impl std::fmt::Display) -> RainfallError {
    RainfallError::Persistence(format!("KML: {}", err))
}

fn open(writer: &mut KmlWriter, tag: BytesStart<'_>) -> Result<()> {
    writer.write_event(Event::Start(tag)).map_err(kml_error)
}

fn close(writer: &mut KmlWriter, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(kml_error)
}

fn text_element(writer: &mut KmlWriter, name: &str, text: &str) -> Result<()> {
    open(writer, BytesStart::new(name))?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(kml_error)?;
    close(writer, name)
}

fn write_placemark(writer: &mut KmlWriter, feature: &RainAreaFeature) -> Result<()> {
    open(writer, BytesStart::new("Placemark"))?;
    text_element(writer, "name", &feature.intensity)?;

    open(writer, BytesStart::new("ExtendedData"))?;
    open(writer, BytesStart::new("Data").with_attributes([("name", INTENSITY_PROPERTY)]))?;
    text_element(writer, "value", &feature.intensity)?;
    close(writer, "Data")?;
    close(writer, "ExtendedData")?;

    // KML wants "lon,lat" tuples separated by whitespace; the ring is already closed
    let coordinates = feature
        .geometry
        .exterior()
        .coords()
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ");

    open(writer, BytesStart::new("Polygon"))?;
    open(writer, BytesStart::new("outerBoundaryIs"))?;
    open(writer, BytesStart::new("LinearRing"))?;
    text_element(writer, "coordinates", &coordinates)?;
    close(writer, "LinearRing")?;
    close(writer, "outerBoundaryIs")?;
    close(writer, "Polygon")?;

    close(writer, "Placemark")
}

impl RainAreaCollection {
    /// KML document with one Placemark per feature, in scan order
    pub fn to_kml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(kml_error)?;

        open(&mut writer, BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]))?;
        open(&mut writer, BytesStart::new("Document"))?;
        text_element(&mut writer, "name", self.source_image.as_deref().unwrap_or("rain areas"))?;
        for feature in &self.features {
            write_placemark(&mut writer, feature)?;
        }
        close(&mut writer, "Document")?;
        close(&mut writer, "kml")?;

        String::from_utf8(writer.into_inner()).map_err(kml_error)
    }

    pub fn save_kml(&self, path: &Path) -> Result<()> {
        write_atomically(path, self.to_kml()?.as_bytes())
    }
}
