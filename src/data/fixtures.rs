//! Shared catalog fixtures for unit tests

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

use super::{CatalogObject, ObjectKind, ObjectStatus, TleData};

pub const ISS_LINE1: &str =
    "1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  9009";
pub const ISS_LINE2: &str =
    "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.50377579432580";

/// ISS element set with catalog descriptors filled in
pub fn iss() -> CatalogObject {
    let mut obj = CatalogObject::bare(25544);
    obj.name = Some("ISS (ZARYA)".into());
    obj.intl_designator = Some("1998-067A".into());
    obj.tle = Some(TleData {
        line1: ISS_LINE1.into(),
        line2: ISS_LINE2.into(),
        epoch: None,
    });
    obj.kind = Some(ObjectKind::Satellite);
    obj.status = Some(ObjectStatus::Active);
    obj.perigee_km = Some(415.0);
    obj.apogee_km = Some(423.0);
    obj
}

/// Object with only the descriptors the filter and statistics stages look at
pub fn described(
    norad_id: u32,
    name: &str,
    perigee_km: Option<f64>,
    kind: Option<ObjectKind>,
    status: Option<ObjectStatus>,
) -> CatalogObject {
    let mut obj = CatalogObject::bare(norad_id);
    obj.name = Some(name.into());
    obj.perigee_km = perigee_km;
    obj.kind = kind;
    obj.status = status;
    obj
}

/// Serve one canned HTTP response per entry, in order
pub fn serve(responses: Vec<(u16, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
        }
    });
    format!("http://{}", addr)
}
