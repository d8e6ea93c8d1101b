// GML 3.1.1 encoding of geo-types geometries, the markup WFS 1.1.0
// transactions carry. Surfaces and curves use the simple
// Polygon/LineString forms; multi-geometries use MultiSurface/MultiCurve.

use geo_types::{Coord, Geometry, LineString, Polygon};

use crate::error::{Result, ViewerError};
use crate::feature::geometry_type_name;

pub const GML_NS: &str = "http://www.opengis.net/gml";

/// Encode `geometry` as a standalone GML element declaring `srs_name`.
pub fn encode_geometry(geometry: &Geometry<f64>, srs_name: &str) -> Result<String> {
    let mut xml = String::new();
    let root_attrs = format!(
        r#" xmlns:gml="{}" srsName="{}""#,
        GML_NS,
        escape_xml(srs_name)
    );

    match geometry {
        Geometry::Point(point) => {
            xml.push_str(&format!("<gml:Point{}>", root_attrs));
            write_pos(&mut xml, point.0);
            xml.push_str("</gml:Point>");
        }
        Geometry::Line(line) => {
            xml.push_str(&format!("<gml:LineString{}>", root_attrs));
            write_pos_list(&mut xml, [line.start, line.end].into_iter());
            xml.push_str("</gml:LineString>");
        }
        Geometry::LineString(line) => {
            xml.push_str(&format!("<gml:LineString{}>", root_attrs));
            write_pos_list(&mut xml, line.coords().copied());
            xml.push_str("</gml:LineString>");
        }
        Geometry::Polygon(polygon) => write_polygon(&mut xml, polygon, &root_attrs),
        Geometry::Rect(rect) => write_polygon(&mut xml, &rect.to_polygon(), &root_attrs),
        Geometry::Triangle(triangle) => {
            write_polygon(&mut xml, &triangle.to_polygon(), &root_attrs)
        }
        Geometry::MultiPoint(points) => {
            xml.push_str(&format!("<gml:MultiPoint{}>", root_attrs));
            for point in points {
                xml.push_str("<gml:pointMember><gml:Point>");
                write_pos(&mut xml, point.0);
                xml.push_str("</gml:Point></gml:pointMember>");
            }
            xml.push_str("</gml:MultiPoint>");
        }
        Geometry::MultiLineString(lines) => {
            xml.push_str(&format!("<gml:MultiCurve{}>", root_attrs));
            for line in lines {
                xml.push_str("<gml:curveMember><gml:LineString>");
                write_pos_list(&mut xml, line.coords().copied());
                xml.push_str("</gml:LineString></gml:curveMember>");
            }
            xml.push_str("</gml:MultiCurve>");
        }
        Geometry::MultiPolygon(polygons) => {
            xml.push_str(&format!("<gml:MultiSurface{}>", root_attrs));
            for polygon in polygons {
                xml.push_str("<gml:surfaceMember>");
                write_polygon(&mut xml, polygon, "");
                xml.push_str("</gml:surfaceMember>");
            }
            xml.push_str("</gml:MultiSurface>");
        }
        other => {
            return Err(ViewerError::UnsupportedGeometry(
                geometry_type_name(other).to_string(),
            ))
        }
    }

    Ok(xml)
}

fn write_polygon(xml: &mut String, polygon: &Polygon<f64>, attrs: &str) {
    xml.push_str(&format!("<gml:Polygon{}>", attrs));
    xml.push_str("<gml:exterior>");
    write_ring(xml, polygon.exterior());
    xml.push_str("</gml:exterior>");
    for interior in polygon.interiors() {
        xml.push_str("<gml:interior>");
        write_ring(xml, interior);
        xml.push_str("</gml:interior>");
    }
    xml.push_str("</gml:Polygon>");
}

fn write_ring(xml: &mut String, ring: &LineString<f64>) {
    xml.push_str("<gml:LinearRing>");
    write_pos_list(xml, ring.coords().copied());
    xml.push_str("</gml:LinearRing>");
}

fn write_pos(xml: &mut String, coord: Coord<f64>) {
    xml.push_str(&format!(
        r#"<gml:pos srsDimension="2">{} {}</gml:pos>"#,
        coord.x, coord.y
    ));
}

fn write_pos_list(xml: &mut String, coords: impl Iterator<Item = Coord<f64>>) {
    let list = coords
        .map(|c| format!("{} {}", c.x, c.y))
        .collect::<Vec<String>>()
        .join(" ");
    xml.push_str(&format!(
        r#"<gml:posList srsDimension="2">{}</gml:posList>"#,
        list
    ));
}

pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decode the predefined entities in XML character data.
pub fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
