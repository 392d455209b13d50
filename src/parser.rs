use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{Result, TrackError};
use crate::gpx_types::*;

const GPX_1_0: &[u8] = b"http://www.topografix.com/GPX/1/0";
const GPX_1_1: &[u8] = b"http://www.topografix.com/GPX/1/1";
const TRACK_POINT_EXTENSION_V1: &[u8] = b"http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
const TRACK_POINT_EXTENSION_V2: &[u8] = b"http://www.garmin.com/xmlschemas/TrackPointExtension/v2";
const POWER_EXTENSION_V1: &[u8] = b"http://www.garmin.com/xmlschemas/PowerExtension/v1";

/// What an element's namespace means to us, independent of the prefix the
/// document happened to bind it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NsRole {
    Gpx,
    TrackPointExtension,
    PowerExtension,
    Foreign,
}

/// Namespace URI -> role lookup, built once per document.
struct NamespaceTable {
    roles: HashMap<Vec<u8>, NsRole>,
}

impl NamespaceTable {
    fn new() -> Self {
        let roles = [
            (GPX_1_0, NsRole::Gpx),
            (GPX_1_1, NsRole::Gpx),
            (TRACK_POINT_EXTENSION_V1, NsRole::TrackPointExtension),
            (TRACK_POINT_EXTENSION_V2, NsRole::TrackPointExtension),
            (POWER_EXTENSION_V1, NsRole::PowerExtension),
        ]
        .into_iter()
        .map(|(uri, role)| (uri.to_vec(), role))
        .collect();
        Self { roles }
    }

    /// Whatever namespace the root <gpx> lives in holds the core elements,
    /// even when it is not one of the published GPX URIs.
    fn declare_root(&mut self, resolved: &ResolveResult<'_>) {
        if let ResolveResult::Bound(Namespace(uri)) = resolved {
            if !self.roles.contains_key(*uri) {
                debug!(
                    "treating root namespace {} as GPX",
                    String::from_utf8_lossy(uri)
                );
                self.roles.insert(uri.to_vec(), NsRole::Gpx);
            }
        }
    }

    /// Unprefixed elements in a document without a default namespace are
    /// treated as core GPX elements.
    fn role(&self, resolved: &ResolveResult<'_>) -> NsRole {
        match resolved {
            ResolveResult::Unbound => NsRole::Gpx,
            ResolveResult::Bound(Namespace(uri)) => {
                self.roles.get(*uri).copied().unwrap_or(NsRole::Foreign)
            }
            ResolveResult::Unknown(_) => NsRole::Foreign,
        }
    }
}

/// Read and parse the GPX file at `path`.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|source| TrackError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", xml.len(), path.display());
    parse_gpx(&xml)
}

/// Parse a GPX XML string into a Document.
pub fn parse_gpx(xml: &str) -> Result<Document> {
    let mut parser = GpxParser::new(xml);
    let doc = parser.parse_document()?;
    debug!(
        "parsed GPX document: {} track(s), {} waypoint(s)",
        doc.tracks.len(),
        doc.waypoints.len()
    );
    Ok(doc)
}

/// All points of the first track, or an empty list when the document has none.
pub fn extract_points(doc: &Document) -> Vec<TrackPoint> {
    doc.track_points(0).unwrap_or_default()
}

/// All points of the track at `index`.
pub fn extract_track_points(doc: &Document, index: usize) -> Option<Vec<TrackPoint>> {
    doc.track_points(index)
}

struct GpxParser<'a> {
    reader: NsReader<&'a [u8]>,
    namespaces: NamespaceTable,
}

impl<'a> GpxParser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: NsReader::from_str(xml),
            namespaces: NamespaceTable::new(),
        }
    }

    fn next(&mut self) -> Result<(NsRole, Event<'a>)> {
        let (resolved, event) = self.reader.read_resolved_event()?;
        let role = self.namespaces.role(&resolved);
        Ok((role, event))
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> Result<()> {
        self.reader.read_to_end(start.name())?;
        Ok(())
    }

    fn parse_document(&mut self) -> Result<Document> {
        loop {
            let (resolved, event) = self.reader.read_resolved_event()?;
            let mut doc = match &event {
                Event::Start(e) | Event::Empty(e) => parse_root(e)?,
                Event::Eof => {
                    return Err(TrackError::MalformedDocument(
                        "missing <gpx> root element".to_string(),
                    ));
                }
                _ => continue,
            };
            self.namespaces.declare_root(&resolved);
            if let Event::Start(_) = event {
                self.parse_root_children(&mut doc)?;
            }
            return Ok(doc);
        }
    }

    fn parse_root_children(&mut self, doc: &mut Document) -> Result<()> {
        loop {
            match self.next()? {
                (NsRole::Gpx, Event::Start(e)) => match e.local_name().as_ref() {
                    b"wpt" => doc.waypoints.push(self.parse_waypoint(&e)?),
                    b"trk" => doc.tracks.push(self.parse_track()?),
                    _ => self.skip(&e)?,
                },
                (_, Event::Start(e)) => self.skip(&e)?,
                (NsRole::Gpx, Event::Empty(e)) => {
                    if e.local_name().as_ref() == b"wpt" {
                        let (lat, lon) = parse_lat_lon(&e, "wpt")?;
                        doc.waypoints.push(Waypoint::new(lat, lon));
                    }
                }
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("gpx")),
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse a <wpt> element. Called after receiving Event::Start for it.
    fn parse_waypoint(&mut self, start: &BytesStart<'_>) -> Result<Waypoint> {
        let (lat, lon) = parse_lat_lon(start, "wpt")?;
        let mut waypoint = Waypoint::new(lat, lon);

        loop {
            match self.next()? {
                (NsRole::Gpx, Event::Start(e)) => match e.local_name().as_ref() {
                    b"ele" => waypoint.elevation = Some(parse_number(&self.read_text(&e)?, "ele")?),
                    b"time" => waypoint.time = Some(parse_timestamp(&self.read_text(&e)?)?),
                    b"name" => waypoint.name = Some(self.read_text(&e)?),
                    _ => self.skip(&e)?,
                },
                (_, Event::Start(e)) => self.skip(&e)?,
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("wpt")),
                _ => {}
            }
        }

        Ok(waypoint)
    }

    /// Parse a <trk> element.
    fn parse_track(&mut self) -> Result<Track> {
        let mut track = Track::default();

        loop {
            match self.next()? {
                (NsRole::Gpx, Event::Start(e)) => match e.local_name().as_ref() {
                    b"name" => track.name = Some(self.read_text(&e)?),
                    b"type" => track.activity_type = Some(self.read_text(&e)?),
                    b"trkseg" => {
                        let seg = self.parse_segment()?;
                        if !seg.points.is_empty() {
                            track.segments.push(seg);
                        }
                    }
                    _ => self.skip(&e)?,
                },
                (_, Event::Start(e)) => self.skip(&e)?,
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("trk")),
                _ => {}
            }
        }

        Ok(track)
    }

    /// Parse a <trkseg> element.
    fn parse_segment(&mut self) -> Result<TrackSegment> {
        let mut segment = TrackSegment::default();

        loop {
            match self.next()? {
                (NsRole::Gpx, Event::Start(e)) if e.local_name().as_ref() == b"trkpt" => {
                    segment.points.push(self.parse_track_point(&e)?);
                }
                (_, Event::Start(e)) => self.skip(&e)?,
                (NsRole::Gpx, Event::Empty(e)) => {
                    if e.local_name().as_ref() == b"trkpt" {
                        let (lat, lon) = parse_lat_lon(&e, "trkpt")?;
                        segment.points.push(TrackPoint::new(lat, lon));
                    }
                }
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("trkseg")),
                _ => {}
            }
        }

        Ok(segment)
    }

    /// Parse a <trkpt> element and its children, including the optional
    /// <extensions> block.
    fn parse_track_point(&mut self, start: &BytesStart<'_>) -> Result<TrackPoint> {
        let (lat, lon) = parse_lat_lon(start, "trkpt")?;
        let mut point = TrackPoint::new(lat, lon);

        loop {
            match self.next()? {
                (NsRole::Gpx, Event::Start(e)) => match e.local_name().as_ref() {
                    b"ele" => point.elevation = Some(parse_number(&self.read_text(&e)?, "ele")?),
                    b"time" => point.time = Some(parse_timestamp(&self.read_text(&e)?)?),
                    b"extensions" => self.parse_extensions(&mut point)?,
                    _ => self.skip(&e)?,
                },
                (_, Event::Start(e)) => self.skip(&e)?,
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("trkpt")),
                _ => {}
            }
        }

        Ok(point)
    }

    /// Walk an <extensions> block (or a power extension container inside it).
    fn parse_extensions(&mut self, point: &mut TrackPoint) -> Result<()> {
        loop {
            match self.next()? {
                (role, Event::Start(e)) => match (role, e.local_name().as_ref()) {
                    (NsRole::TrackPointExtension, b"TrackPointExtension") => {
                        self.parse_track_point_extension(point)?
                    }
                    (NsRole::PowerExtension, b"PowerExtension") => self.parse_extensions(point)?,
                    (NsRole::Gpx, b"power") | (NsRole::PowerExtension, b"PowerInWatts") => {
                        point.power = Some(parse_integer(&self.read_text(&e)?, "power")?)
                    }
                    _ => self.skip(&e)?,
                },
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("extensions")),
                _ => {}
            }
        }

        Ok(())
    }

    fn parse_track_point_extension(&mut self, point: &mut TrackPoint) -> Result<()> {
        loop {
            match self.next()? {
                (NsRole::TrackPointExtension, Event::Start(e)) => match e.local_name().as_ref() {
                    b"hr" => point.heart_rate = Some(parse_integer(&self.read_text(&e)?, "hr")?),
                    b"cad" => point.cadence = Some(parse_integer(&self.read_text(&e)?, "cad")?),
                    _ => self.skip(&e)?,
                },
                (_, Event::Start(e)) => self.skip(&e)?,
                (_, Event::End(_)) => break,
                (_, Event::Eof) => return Err(unexpected_eof("TrackPointExtension")),
                _ => {}
            }
        }

        Ok(())
    }

    /// Read text content of an element as an owned String.
    /// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
    fn read_text(&mut self, start: &BytesStart<'_>) -> Result<String> {
        let end_name = start.name().0.to_vec();
        let mut text = String::new();

        loop {
            match self.reader.read_event()? {
                Event::Text(e) => {
                    text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
                Event::CData(e) => {
                    text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
                Event::GeneralRef(e) => {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        text.push(ch);
                    } else {
                        match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                            "amp" => text.push('&'),
                            "lt" => text.push('<'),
                            "gt" => text.push('>'),
                            "quot" => text.push('"'),
                            "apos" => text.push('\''),
                            _ => {}
                        }
                    }
                }
                Event::End(e) if e.name().0 == end_name.as_slice() => break,
                Event::Eof => return Err(unexpected_eof("text element")),
                _ => {}
            }
        }

        Ok(text)
    }
}

fn unexpected_eof(element: &str) -> TrackError {
    TrackError::MalformedDocument(format!("document ends inside <{element}>"))
}

/// Validate the root element and pull its version/creator attributes.
fn parse_root(e: &BytesStart<'_>) -> Result<Document> {
    if e.local_name().as_ref() != b"gpx" {
        return Err(TrackError::MalformedDocument(format!(
            "expected <gpx> root element, found <{}>",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }

    let mut doc = Document::default();
    for attr_result in e.attributes() {
        let attr = attr_result?;
        match attr.key.local_name().as_ref() {
            b"version" => doc.version = Some(attr.unescape_value()?.into_owned()),
            b"creator" => doc.creator = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    Ok(doc)
}

/// Parse the required lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_number(val, "lat")?),
            b"lon" => lon = Some(parse_number(val, "lon")?),
            _ => {}
        }
    }

    let lat = lat.ok_or(TrackError::MissingField {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(TrackError::MissingField {
        element,
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// Finite decimal only; `NaN` and `inf` are rejected like any other garbage.
fn parse_number(text: &str, field: &'static str) -> Result<f64> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| TrackError::MalformedNumber {
            field,
            value: text.to_string(),
        })
}

fn parse_integer(text: &str, field: &'static str) -> Result<u32> {
    let text = text.trim();
    text.parse::<u32>().map_err(|_| TrackError::MalformedNumber {
        field,
        value: text.to_string(),
    })
}

/// RFC 3339, or a zone-less date-time which is taken as UTC.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| TrackError::MalformedTimestamp {
            value: text.to_string(),
        })
}
