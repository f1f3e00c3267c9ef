use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, no_open: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(progress_server::serve(root, port, !no_open))
        .with_context(|| format!("progress UI for {} stopped", root.display()))
}
