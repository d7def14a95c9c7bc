use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};

use crate::{http::USER_AGENT, reconcile::NodeEditRecord, Error, Result};

pub fn render<W: Write>(out: W, records: &[NodeEditRecord]) -> Result<W> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("osm");
    root.push_attribute(("version", "0.6"));
    root.push_attribute(("generator", USER_AGENT));
    writer.write_event(Event::Start(root))?;

    for record in records {
        let mut node = BytesStart::new("node");
        node.push_attribute(("id", record.id.to_string().as_str()));
        node.push_attribute(("lat", record.point.y().to_string().as_str()));
        node.push_attribute(("lon", record.point.x().to_string().as_str()));
        node.push_attribute(("version", record.version.to_string().as_str()));

        if record.tags.is_empty() {
            writer.write_event(Event::Empty(node))?;
            continue;
        }

        writer.write_event(Event::Start(node))?;
        for (k, v) in &record.tags {
            let mut tag = BytesStart::new("tag");
            tag.push_attribute(("k", k.as_str()));
            tag.push_attribute(("v", v.as_str()));
            writer.write_event(Event::Empty(tag))?;
        }
        writer.write_event(Event::End(BytesEnd::new("node")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("osm")))?;
    let mut out = writer.into_inner();
    out.write_all(b"\n")?;
    Ok(out)
}

pub fn write_file(path: &Path, records: &[NodeEditRecord]) -> Result<()> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = File::create(&part)
        .map_err(Error::from)
        .and_then(|file| render(BufWriter::new(file), records))
        .and_then(|mut x| x.flush().map_err(Error::from));
    if let Err(e) = result {
        let _ = fs::remove_file(&part);
        return Err(e);
    }

    if let Err(e) = fs::rename(&part, path) {
        let _ = fs::remove_file(&part);
        return Err(e.into());
    }
    Ok(())
}
