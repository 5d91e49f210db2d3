// src/pipeline.rs
//! Staging → per-file ingest/normalize/validate on a bounded pool → merge.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::archive::FileDescriptor;
use crate::config::{PipelineConfig, SkipList};
use crate::consolidate::{consolidate, FileRows, MasterTable};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::ingest::Ingestor;
use crate::schema::{normalize, AliasTable};
use crate::sink::Sink;
use crate::stage::{stage, Resource};
use crate::validate::validate;

/// One configured run of the consolidation engine.
pub struct Pipeline {
    config: PipelineConfig,
    aliases: AliasTable,
    skip: SkipList,
    diag: Diagnostics,
    pool: ThreadPool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let aliases = AliasTable::with_extra(&config.extra_aliases)?;
        let skip = config.skip_list()?;
        // 0 lets rayon pick one thread per CPU
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("ingest-{}", i))
            .build()
            .map_err(|e| Error::Config(format!("worker pool: {}", e)))?;
        info!(
            workers = pool.current_num_threads(),
            aliases = aliases.len(),
            alias_version = aliases.version(),
            "pipeline ready"
        );
        Ok(Self {
            config,
            aliases,
            skip,
            diag: Diagnostics::new(),
            pool,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Stage downloads and local inputs into the configured output dir.
    pub fn stage(&self, resources: Vec<Resource>) -> Result<Vec<FileDescriptor>> {
        stage(resources, &self.config.output_dir, &self.diag)
    }

    /// Ingest, normalize and validate one file. `None` when the file was
    /// skipped; the reason is already in the diagnostics.
    #[instrument(level = "debug", skip_all, fields(file = %desc.name))]
    pub fn process_file(&self, desc: &FileDescriptor) -> Option<FileRows> {
        let ingestor = Ingestor::new(&self.skip, &self.config.encodings, &self.aliases);
        let raw = ingestor.ingest(desc, &self.diag)?;
        let normalized = normalize(raw, &self.aliases);
        let present = normalized.present;
        let (rows, _) = validate(normalized, &desc.name, &self.diag);
        Some(FileRows {
            name: desc.name.clone(),
            rows,
            present,
        })
    }

    /// Process every file on the worker pool, then merge the results in
    /// descriptor order once all of them are in.
    pub fn consolidate(&self, files: &[FileDescriptor]) -> Result<MasterTable> {
        let start = Instant::now();
        let results: Vec<Option<FileRows>> = self
            .pool
            .install(|| files.par_iter().map(|d| self.process_file(d)).collect());
        info!(files = files.len(), elapsed = ?start.elapsed(), "per-file stages done");
        consolidate(results)
    }

    /// Stage `resources` and consolidate everything they produced. The
    /// diagnostics afterwards describe this run only.
    #[instrument(level = "info", skip_all, fields(resources = resources.len()))]
    pub fn run(&self, resources: Vec<Resource>) -> Result<MasterTable> {
        self.diag.reset();
        let files = self.stage(resources)?;
        let result = self.consolidate(&files);
        self.diag.log_summary();
        if let Err(e) = &result {
            error!("run produced no table: {}", e);
        }
        result
    }

    /// [`Pipeline::run`], then hand the table to `sink` with the configured
    /// mode. The sink is never called when the run fails.
    pub fn run_and_persist(
        &self,
        resources: Vec<Resource>,
        sink: &mut dyn Sink,
    ) -> Result<MasterTable> {
        let table = self.run(resources)?;
        sink.write(&table, self.config.sink.mode)?;
        Ok(table)
    }
}
