use crate::{prtls::Prtl, Float, Output};
use anyhow::{Context, Result};

fn save_prtl_quantity(vals: &[Float], name: &str, cfg: &Output) -> Result<()> {
    let out_vec: Vec<Float> = vals.iter().step_by(cfg.stride).copied().collect();
    npy::to_file(format!("{}/{}.npy", cfg.outdir, name), out_vec)
        .context(format!("Could not save {} data to file", name))?;
    Ok(())
}

pub(crate) fn save_output(cfg: &Output, prtls: &Prtl) -> Result<()> {
    std::fs::create_dir_all(&cfg.outdir).context("Unable to create output directory")?;

    for (vals, name) in &[
        (&prtls.x, "x"),
        (&prtls.y, "y"),
        (&prtls.px, "px"),
        (&prtls.py, "py"),
    ] {
        save_prtl_quantity(vals, name, cfg)?;
    }

    let state: Vec<i64> = prtls.state.iter().step_by(cfg.stride).copied().collect();
    npy::to_file(format!("{}/state.npy", cfg.outdir), state)
        .context("Could not save prtl state to file")?;

    Ok(())
}
