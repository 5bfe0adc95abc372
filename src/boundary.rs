use crate::error::BoundaryError;
use roxmltree::{Document, Node};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Closed ring of (longitude, latitude) vertices.
pub type Ring = Vec<[f64; 2]>;

/// Polygon boundary extracted from a KML or KMZ file. The first ring is the
/// outer boundary and is always closed; any following rings are holes.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryGeometry {
    pub rings: Vec<Ring>,
}

impl BoundaryGeometry {
    /// GeoJSON-style polygon payload for catalog requests.
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": self.rings,
        })
    }
}

/// Extracts the boundary polygon from `path`.
///
/// Accepts a bare `.kml` document or a `.kmz` archive containing one. Only
/// the first feature is used; a multi-polygon contributes its first member
/// polygon only. Altitude components are dropped from every vertex.
pub fn load(path: &Path) -> Result<BoundaryGeometry, BoundaryError> {
    let kml = read_kml(path)?;
    parse_kml(&kml)
}

fn read_kml(path: &Path) -> Result<String, BoundaryError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());

    match extension.as_deref() {
        Some("kml") => Ok(fs::read_to_string(path)?),
        Some("kmz") => extract_kml_member(path),
        _ => Err(BoundaryError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Reads the single `.kml` member of a KMZ archive into memory. Nothing is
/// written to disk, so there is no extraction file to clean up.
fn extract_kml_member(path: &Path) -> Result<String, BoundaryError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let member = archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".kml"))
        .map(str::to_owned)
        .ok_or_else(|| BoundaryError::MissingArchiveMember(path.display().to_string()))?;

    let mut contents = String::new();
    archive.by_name(&member)?.read_to_string(&mut contents)?;
    Ok(contents)
}

fn parse_kml(kml: &str) -> Result<BoundaryGeometry, BoundaryError> {
    let document = Document::parse(kml)?;

    let placemark = document
        .descendants()
        .find(|node| node.has_tag_name("Placemark"))
        .ok_or(BoundaryError::NoFeaturesFound)?;

    let polygon = first_polygon(placemark)?;
    let mut rings = polygon_rings(polygon)?;
    close_first_ring(&mut rings);

    Ok(BoundaryGeometry { rings })
}

const GEOMETRY_TAGS: [&str; 6] = [
    "Polygon",
    "MultiGeometry",
    "Point",
    "LineString",
    "LinearRing",
    "Model",
];

fn first_polygon<'a, 'input>(
    placemark: Node<'a, 'input>,
) -> Result<Node<'a, 'input>, BoundaryError> {
    let geometry = placemark
        .children()
        .find(|node| node.is_element() && GEOMETRY_TAGS.contains(&node.tag_name().name()))
        .ok_or_else(|| BoundaryError::UnsupportedGeometryType("none".to_string()))?;

    match geometry.tag_name().name() {
        "Polygon" => Ok(geometry),
        "MultiGeometry" => {
            let polygons: Vec<Node> = geometry
                .children()
                .filter(|node| node.has_tag_name("Polygon"))
                .collect();
            match polygons.first() {
                None => Err(BoundaryError::UnsupportedGeometryType(
                    "MultiGeometry".to_string(),
                )),
                Some(&first) => {
                    info!(
                        "boundary is a multi-polygon; extracting the first polygon and ignoring {} other(s)",
                        polygons.len() - 1
                    );
                    Ok(first)
                }
            }
        }
        other => Err(BoundaryError::UnsupportedGeometryType(other.to_string())),
    }
}

fn polygon_rings(polygon: Node) -> Result<Vec<Ring>, BoundaryError> {
    let mut rings = Vec::new();

    if let Some(outer) = polygon
        .descendants()
        .find(|node| node.has_tag_name("outerBoundaryIs"))
    {
        rings.push(ring_coordinates(outer)?);
    }
    for inner in polygon
        .descendants()
        .filter(|node| node.has_tag_name("innerBoundaryIs"))
    {
        rings.push(ring_coordinates(inner)?);
    }

    if rings.is_empty() {
        return Err(BoundaryError::MissingCoordinates);
    }
    Ok(rings)
}

fn ring_coordinates(boundary: Node) -> Result<Ring, BoundaryError> {
    let coordinates = boundary
        .descendants()
        .find(|node| node.has_tag_name("coordinates"))
        .and_then(|node| node.text())
        .ok_or(BoundaryError::MissingCoordinates)?;
    parse_coordinates(coordinates)
}

/// Parses a KML coordinate list: whitespace-separated `lon,lat[,altitude]`
/// tuples. The altitude component is discarded.
fn parse_coordinates(text: &str) -> Result<Ring, BoundaryError> {
    let mut ring = Ring::new();
    for tuple in text.split_whitespace() {
        let mut components = tuple.split(',');
        let (Some(lon), Some(lat)) = (components.next(), components.next()) else {
            return Err(BoundaryError::InvalidCoordinate(tuple.to_string()));
        };
        let lon: f64 = lon
            .parse()
            .map_err(|_| BoundaryError::InvalidCoordinate(tuple.to_string()))?;
        let lat: f64 = lat
            .parse()
            .map_err(|_| BoundaryError::InvalidCoordinate(tuple.to_string()))?;
        ring.push([lon, lat]);
    }
    if ring.is_empty() {
        return Err(BoundaryError::MissingCoordinates);
    }
    Ok(ring)
}

fn close_first_ring(rings: &mut [Ring]) {
    let Some(ring) = rings.first_mut() else {
        return;
    };
    match (ring.first().copied(), ring.last().copied()) {
        (Some(head), Some(tail)) if head != tail => ring.push(head),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const CLOSED_POLYGON_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>field</name>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>
              -111.05,45.67,1200.5 -111.04,45.67,1201.0 -111.04,45.68,1199.0 -111.05,45.67,1200.5
            </coordinates>
          </LinearRing>
        </outerBoundaryIs>
      </Polygon>
    </Placemark>
  </Document>
</kml>"#;

    const OPEN_POLYGON_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark>
    <Polygon>
      <outerBoundaryIs>
        <LinearRing>
          <coordinates>-111.05,45.67 -111.04,45.67 -111.04,45.68</coordinates>
        </LinearRing>
      </outerBoundaryIs>
    </Polygon>
  </Placemark>
</kml>"#;

    const MULTI_POLYGON_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark>
    <MultiGeometry>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>0,0 1,0 1,1 0,0</coordinates>
          </LinearRing>
        </outerBoundaryIs>
      </Polygon>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>5,5 6,5 6,6 5,5</coordinates>
          </LinearRing>
        </outerBoundaryIs>
      </Polygon>
    </MultiGeometry>
  </Placemark>
</kml>"#;

    const POINT_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark>
    <Point><coordinates>-111.05,45.67</coordinates></Point>
  </Placemark>
</kml>"#;

    const EMPTY_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document><name>empty</name></Document>
</kml>"#;

    const HOLE_POLYGON_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark>
    <Polygon>
      <outerBoundaryIs>
        <LinearRing><coordinates>0,0 4,0 4,4 0,4 0,0</coordinates></LinearRing>
      </outerBoundaryIs>
      <innerBoundaryIs>
        <LinearRing><coordinates>1,1 2,1 2,2 1,1</coordinates></LinearRing>
      </innerBoundaryIs>
    </Polygon>
  </Placemark>
</kml>"#;

    fn write_kmz(path: &Path, member_name: &str, contents: &str) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(member_name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_closed_polygon_round_trip() {
        let geometry = parse_kml(CLOSED_POLYGON_KML).unwrap();
        assert_eq!(geometry.rings.len(), 1);

        let ring = &geometry.rings[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        // altitude components are gone
        assert_eq!(ring[0], [-111.05, 45.67]);
        assert_eq!(ring[1], [-111.04, 45.67]);
    }

    #[test]
    fn test_open_ring_is_closed() {
        let geometry = parse_kml(OPEN_POLYGON_KML).unwrap();
        let ring = &geometry.rings[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_multi_polygon_takes_first_member() {
        let geometry = parse_kml(MULTI_POLYGON_KML).unwrap();
        assert_eq!(geometry.rings.len(), 1);
        assert_eq!(geometry.rings[0][0], [0.0, 0.0]);
    }

    #[test]
    fn test_point_geometry_rejected() {
        let result = parse_kml(POINT_KML);
        assert!(matches!(
            result,
            Err(BoundaryError::UnsupportedGeometryType(ref tag)) if tag == "Point"
        ));
    }

    #[test]
    fn test_no_features() {
        assert!(matches!(
            parse_kml(EMPTY_KML),
            Err(BoundaryError::NoFeaturesFound)
        ));
    }

    #[test]
    fn test_inner_rings_follow_outer() {
        let geometry = parse_kml(HOLE_POLYGON_KML).unwrap();
        assert_eq!(geometry.rings.len(), 2);
        assert_eq!(geometry.rings[0][0], [0.0, 0.0]);
        assert_eq!(geometry.rings[1][0], [1.0, 1.0]);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load(Path::new("./boundary.geojson"));
        assert!(matches!(result, Err(BoundaryError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_kmz_member_extracted() {
        let dir = tempdir().unwrap();
        let kmz_path = dir.path().join("field.kmz");
        write_kmz(&kmz_path, "doc.kml", CLOSED_POLYGON_KML);

        let geometry = load(&kmz_path).unwrap();
        assert_eq!(geometry.rings[0].len(), 4);
    }

    #[test]
    fn test_kmz_without_kml_member() {
        let dir = tempdir().unwrap();
        let kmz_path = dir.path().join("field.kmz");
        write_kmz(&kmz_path, "readme.txt", "not a boundary");

        assert!(matches!(
            load(&kmz_path),
            Err(BoundaryError::MissingArchiveMember(_))
        ));
    }

    #[test]
    fn test_kml_file_loaded_directly() {
        let dir = tempdir().unwrap();
        let kml_path = dir.path().join("field.kml");
        fs::write(&kml_path, OPEN_POLYGON_KML).unwrap();

        let geometry = load(&kml_path).unwrap();
        assert_eq!(geometry.rings[0].first(), geometry.rings[0].last());
    }

    #[test]
    fn test_geojson_payload_shape() {
        let geometry = parse_kml(CLOSED_POLYGON_KML).unwrap();
        let payload = geometry.to_geojson();
        assert_eq!(payload["type"], "Polygon");
        assert_eq!(payload["coordinates"][0][0][0], -111.05);
    }
}
