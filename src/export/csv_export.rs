use crate::models::Candidate;
use anyhow::Result;
use csv::Writer;
use std::io::Write;

const HEADERS: [&str; 7] = ["Name", "System", "Distance", "DistanceToArrival", "Gravity", "Temperature", "Volcanism"];

pub fn export_to_csv(candidates: &[Candidate], path: &str) -> Result<()> {
    let mut w = Writer::from_path(path)?;
    write_all(&mut w, candidates)?;
    log::info!("wrote {} candidates to {}", candidates.len(), path);
    Ok(())
}

pub fn write_all<W: Write>(w: &mut Writer<W>, candidates: &[Candidate]) -> Result<()> {
    w.write_record(HEADERS)?;
    for c in candidates { write_candidate(w, c)?; }
    w.flush()?;
    Ok(())
}

fn write_candidate<W: Write>(w: &mut Writer<W>, c: &Candidate) -> Result<()> {
    w.write_record(&[
        c.body.name.clone(),
        c.body.system_name.clone(),
        format!("{:.2}", c.distance),
        format!("{:.2}", c.body.distance_to_arrival),
        format!("{:.2}", c.body.gravity),
        format!("{:.1}", c.body.surface_temperature),
        c.body.volcanism_type.clone(),
    ])?;
    Ok(())
}
