// src/graph/catalog.rs

//! The build-time rule catalog and output directory layout.
//!
//! Branch selection happens here: only the templates belonging to the
//! selected mapper/coverage/quantification branches are emitted, so an
//! unselected branch contributes zero task nodes. Directory names carry the
//! branch tags (`mapped_reads/<mapper>/...`, `bigwig_files/<mapper>/<tool>/...`)
//! so switching a branch changes subdirectories instead of overwriting the
//! other branch's results.

use std::path::{Path, PathBuf};

use crate::analysis::AnalysisSpec;
use crate::branch::{BranchSelection, CoverageTool, Mapper, QuantLevel};
use crate::config::ConfigFile;
use crate::graph::template::{Resources, RuleTemplate, SampleFilter};
use crate::samples::SampleRegistry;

/// File names produced by `salmon index`.
const SALMON_INDEX_FILES: &[&str] = &[
    "complete_ref_lens.bin",
    "ctable.bin",
    "ctg_offsets.bin",
    "duplicate_clusters.tsv",
    "info.json",
    "mphf.bin",
    "pos.bin",
    "rank.bin",
    "refAccumLengths.bin",
    "ref_indexing.log",
    "reflengths.bin",
    "refseq.bin",
    "seq.bin",
    "versionInfo.json",
];

/// Resolved output tree for one branch selection.
///
/// All path helpers return strings because they double as path *patterns*:
/// the catalog calls them with the literal `"{sample}"` / `"{analysis}"`
/// placeholder, the target catalog calls them with concrete names.
#[derive(Debug, Clone)]
pub struct Layout {
    pub output_dir: PathBuf,
    pub reads_dir: PathBuf,
    pub log_dir: PathBuf,
    pub trimmed_reads_dir: PathBuf,
    pub qc_dir: PathBuf,
    pub multiqc_dir: PathBuf,
    pub mapped_reads_dir: PathBuf,
    pub bigwig_dir: PathBuf,
    pub counts_dir: PathBuf,
    pub salmon_dir: PathBuf,
    pub salmon_index_dir: PathBuf,
    pub star_index_dir: PathBuf,
    pub hisat2_index_dir: PathBuf,
    pub report_mapper_dir: PathBuf,
    pub report_salmon_dir: PathBuf,
    mapper: Mapper,
    coverage: CoverageTool,
    genome_build: String,
}

fn s(path: PathBuf) -> String {
    path.display().to_string()
}

impl Layout {
    pub fn new(cfg: &ConfigFile, branches: &BranchSelection) -> Self {
        let out = &cfg.locations.output_dir;
        Self {
            output_dir: out.clone(),
            reads_dir: cfg.locations.reads_dir.clone(),
            log_dir: out.join("logs"),
            trimmed_reads_dir: out.join("trimmed_reads"),
            qc_dir: out.join("QC"),
            multiqc_dir: out.join("multiqc"),
            mapped_reads_dir: out.join("mapped_reads").join(branches.mapper.as_str()),
            bigwig_dir: out
                .join("bigwig_files")
                .join(branches.mapper.as_str())
                .join(branches.coverage.as_str()),
            counts_dir: out.join("feature_counts"),
            salmon_dir: out.join("salmon_output"),
            salmon_index_dir: out.join("salmon_index"),
            star_index_dir: out.join("star_index"),
            hisat2_index_dir: out.join("hisat2_index"),
            report_mapper_dir: out.join("report").join(branches.mapper.as_str()),
            report_salmon_dir: out.join("report").join("salmon"),
            mapper: branches.mapper,
            coverage: branches.coverage,
            genome_build: cfg.mapping.genome_build.clone(),
        }
    }

    pub fn mapper(&self) -> Mapper {
        self.mapper
    }

    pub fn annotation_stats(&self) -> String {
        s(self.output_dir.join("input_annotation_stats.tsv"))
    }

    /// The one artifact appended to every required-file set.
    pub fn annotations_archive(&self) -> String {
        s(self.output_dir.join("annotations.tgz"))
    }

    pub fn col_data(&self) -> String {
        s(self.output_dir.join("colData.tsv"))
    }

    pub fn trimmed_r1(&self, sample: &str) -> String {
        s(self.trimmed_reads_dir.join(format!("{sample}.trimmed.R1.fq.gz")))
    }

    pub fn trimmed_r2(&self, sample: &str) -> String {
        s(self.trimmed_reads_dir.join(format!("{sample}.trimmed.R2.fq.gz")))
    }

    pub fn trimmed_single(&self, sample: &str) -> String {
        s(self.trimmed_reads_dir.join(format!("{sample}.trimmed.fq.gz")))
    }

    pub fn bam(&self, sample: &str) -> String {
        s(self.mapped_reads_dir
            .join(format!("{sample}_Aligned.sortedByCoord.out.bam")))
    }

    pub fn bai(&self, sample: &str) -> String {
        format!("{}.bai", self.bam(sample))
    }

    pub fn read_counts_csv(&self, sample: &str) -> String {
        s(self.mapped_reads_dir.join(format!("{sample}.read_counts.csv")))
    }

    /// Coverage outputs for one sample under the selected coverage tool.
    pub fn coverage_files(&self, sample: &str) -> Vec<String> {
        match self.coverage {
            CoverageTool::BamCoverage => vec![
                s(self.bigwig_dir.join(format!("{sample}.forward.bw"))),
                s(self.bigwig_dir.join(format!("{sample}.reverse.bw"))),
                s(self.bigwig_dir.join(format!("{sample}.bw"))),
            ],
            CoverageTool::Megadepth => {
                vec![s(self.bigwig_dir.join(format!("{sample}.all.bw")))]
            }
        }
    }

    pub fn salmon_index_files(&self) -> Vec<String> {
        SALMON_INDEX_FILES
            .iter()
            .map(|f| s(self.salmon_index_dir.join(f)))
            .collect()
    }

    pub fn salmon_index_marker(&self) -> String {
        s(self.salmon_index_dir.join("pos.bin"))
    }

    pub fn quant_sf(&self, sample: &str) -> String {
        s(self.salmon_dir.join(sample).join("quant.sf"))
    }

    pub fn quant_genes_sf(&self, sample: &str) -> String {
        s(self.salmon_dir.join(sample).join("quant.genes.sf"))
    }

    pub fn flen_dist(&self, sample: &str) -> String {
        s(self.salmon_dir.join(sample).join("libParams").join("flenDist.txt"))
    }

    pub fn salmon_raw_counts(&self, level: QuantLevel) -> String {
        s(self.counts_dir
            .join("raw_counts")
            .join("salmon")
            .join(format!("counts_from_SALMON.{}.tsv", level.as_str())))
    }

    pub fn salmon_tpm_counts(&self, level: QuantLevel) -> String {
        s(self.counts_dir
            .join("normalized")
            .join("salmon")
            .join(format!("TPM_counts_from_SALMON.{}.tsv", level.as_str())))
    }

    pub fn mapper_counts(&self) -> String {
        s(self.counts_dir
            .join("raw_counts")
            .join(self.mapper.as_str())
            .join("counts.tsv"))
    }

    pub fn mapper_norm_counts_dir(&self) -> String {
        s(self.counts_dir.join("normalized").join(self.mapper.as_str()))
    }

    pub fn mapper_norm_counts(&self) -> String {
        s(self.counts_dir
            .join("normalized")
            .join(self.mapper.as_str())
            .join("deseq_normalized_counts.tsv"))
    }

    pub fn mapper_size_factors(&self) -> String {
        s(self.counts_dir
            .join("normalized")
            .join(self.mapper.as_str())
            .join("deseq_size_factors.txt"))
    }

    pub fn multiqc_report(&self) -> String {
        s(self.multiqc_dir.join("multiqc_report.html"))
    }

    pub fn mapper_report_html(&self, analysis: &str) -> String {
        s(self.report_mapper_dir.join(format!("{analysis}.deseq.report.html")))
    }

    pub fn mapper_results_tsv(&self, analysis: &str) -> String {
        s(self.report_mapper_dir.join(format!("{analysis}.deseq_results.tsv")))
    }

    pub fn mapper_collated_results(&self) -> String {
        s(self.report_mapper_dir.join("collated.deseq_results.tsv"))
    }

    pub fn salmon_report_html(&self, analysis: &str, level: QuantLevel) -> String {
        s(self.report_salmon_dir.join(format!(
            "{analysis}.salmon.{}.deseq.report.html",
            level.as_str()
        )))
    }

    pub fn salmon_results_tsv(&self, analysis: &str, level: QuantLevel) -> String {
        s(self.report_salmon_dir.join(format!(
            "{analysis}.salmon.{}.deseq_results.tsv",
            level.as_str()
        )))
    }

    pub fn salmon_collated_results(&self, level: QuantLevel) -> String {
        s(self.report_salmon_dir
            .join(format!("collated.{}.deseq_results.tsv", level.as_str())))
    }

    pub fn log(&self, name: &str) -> String {
        s(self.log_dir.join(name))
    }

    fn hisat2_index_prefix(&self) -> String {
        s(self.hisat2_index_dir.join(format!("{}_index", self.genome_build)))
    }

    pub fn hisat2_index_files(&self) -> Vec<String> {
        (1..=8)
            .map(|n| format!("{}.{}.ht2l", self.hisat2_index_prefix(), n))
            .collect()
    }
}

/// Report logo path, selected by the installation mode flag. Affects only
/// asset lookup.
pub fn logo_path(data_dir: &Path, uninstalled: bool) -> PathBuf {
    if uninstalled {
        data_dir.join("images").join("logo.png")
    } else {
        data_dir.join("logo.png")
    }
}

/// Expand the catalog of rule templates for the given branch selection.
///
/// Singleton rules that aggregate over samples or analyses receive fully
/// literal input lists here; per-sample and per-analysis rules keep their
/// placeholders for the builder to bind.
pub fn build_catalog(
    cfg: &ConfigFile,
    branches: &BranchSelection,
    layout: &Layout,
    samples: &SampleRegistry,
    analyses: &[AnalysisSpec],
    sample_sheet: &Path,
    uninstalled: bool,
) -> Vec<RuleTemplate> {
    let gtf = s(cfg.locations.gtf_file.clone());
    let genome = s(cfg.locations.genome_fasta.clone());
    let cdna = s(cfg.locations.cdna_fasta.clone());
    let scripts = s(cfg.locations.scripts_dir.clone());
    let logo = s(logo_path(&cfg.locations.data_dir, uninstalled));
    let rscript = cfg.tool("Rscript");

    let res = |rule: &str| {
        let r = cfg.execution.rule_resources(rule);
        Resources {
            memory_mb: r.memory_mb,
            threads: r.threads,
        }
    };

    let mut catalog = Vec::new();

    catalog.push(
        RuleTemplate::singleton("check_annotation_files")
            .input(&gtf)
            .input(&cdna)
            .input(&genome)
            .output(layout.annotation_stats())
            .cmd(format!(
                "{rscript} {scripts}/validate_input_annotation.R {{input0}} {{input1}} {{input2}} {}",
                s(layout.output_dir.clone())
            ))
            .log(layout.log("check_annotation_files.log"))
            .resources(res("check_annotation_files"))
            .build(),
    );

    // Kept for backwards compatibility of result folders.
    catalog.push(
        RuleTemplate::singleton("record_annotation_files")
            .input(&gtf)
            .input(&cdna)
            .input(&genome)
            .output(layout.annotations_archive())
            .cmd("tar -czf {output0} {input0} {input1} {input2}")
            .log(layout.log("record_annotation_files.log"))
            .resources(res("record_annotation_files"))
            .build(),
    );

    catalog.push(
        RuleTemplate::singleton("translate_sample_sheet")
            .input(s(sample_sheet.to_path_buf()))
            .output(layout.col_data())
            .cmd(format!(
                "{rscript} {scripts}/translate_sample_sheet_for_report.R {{input0}} > {{output0}}"
            ))
            .log(layout.log("translate_sample_sheet.log"))
            .resources(res("translate_sample_sheet"))
            .build(),
    );

    let fastp = cfg.tool("fastp");
    catalog.push(
        RuleTemplate::per_sample("trim_qc_reads_pe")
            .filter(SampleFilter::PairedOnly)
            .raw_reads()
            .output(layout.trimmed_r1("{sample}"))
            .output(layout.trimmed_r2("{sample}"))
            .output(s(layout.qc_dir.join("{sample}.pe.fastp.html")))
            .output(s(layout.qc_dir.join("{sample}.pe.fastp.json")))
            .cmd(format!(
                "{fastp} --in1 {{input0}} --in2 {{input1}} --out1 {{output0}} --out2 {{output1}} -h {{output2}} -j {{output3}}"
            ))
            .log(layout.log("trim_reads.{sample}.log"))
            .resources(res("trim_qc_reads_pe"))
            .build(),
    );
    catalog.push(
        RuleTemplate::per_sample("trim_qc_reads_se")
            .filter(SampleFilter::SingleOnly)
            .raw_reads()
            .output(layout.trimmed_single("{sample}"))
            .output(s(layout.qc_dir.join("{sample}.se.fastp.html")))
            .output(s(layout.qc_dir.join("{sample}.se.fastp.json")))
            .cmd(format!(
                "{fastp} --in1 {{input0}} --out1 {{output0}} -h {{output1}} -j {{output2}}"
            ))
            .log(layout.log("trim_reads.{sample}.log"))
            .resources(res("trim_qc_reads_se"))
            .build(),
    );

    match branches.mapper {
        Mapper::Star => add_star_rules(&mut catalog, cfg, layout, &gtf, &genome, &res),
        Mapper::Hisat2 => add_hisat2_rules(&mut catalog, cfg, layout, &genome, &res),
    }

    let samtools = cfg.tool("samtools");
    catalog.push(
        RuleTemplate::per_sample("index_bam")
            .input(layout.bam("{sample}"))
            .output(layout.bai("{sample}"))
            .cmd(format!("{samtools} index {{input0}} {{output0}}"))
            .log(layout.log("samtools_index_{sample}.log"))
            .resources(res("index_bam"))
            .build(),
    );

    add_salmon_rules(&mut catalog, cfg, branches, layout, samples, &gtf, &cdna, &res);
    add_coverage_rules(&mut catalog, cfg, branches, layout, &res);

    let mapper = branches.mapper.as_str();
    catalog.push(
        RuleTemplate::per_sample("count_reads")
            .input(&gtf)
            .input(layout.bam("{sample}"))
            .input(layout.bai("{sample}"))
            .cmd(format!(
                "{rscript} {scripts}/count_reads.R {{sample}} {{input1}} {{input0}}"
            ))
            .output(layout.read_counts_csv("{sample}"))
            .log(s(layout.log_dir.join(mapper).join("{sample}.count_reads.log")))
            .resources(res("count_reads"))
            .build(),
    );

    let mut collate = RuleTemplate::singleton("collate_read_counts").input(layout.col_data());
    for name in samples.names() {
        collate = collate.input(layout.read_counts_csv(name));
    }
    catalog.push(
        collate
            .output(layout.mapper_counts())
            .cmd(format!(
                "{rscript} {scripts}/collate_read_counts.R {} {} {{output0}}",
                s(layout.mapped_reads_dir.clone()),
                layout.col_data()
            ))
            .log(s(layout.log_dir.join(mapper).join("collate_read_counts.log")))
            .resources(res("collate_read_counts"))
            .build(),
    );

    catalog.push(
        RuleTemplate::singleton("norm_counts_deseq")
            .input(layout.mapper_counts())
            .input(layout.col_data())
            .output(layout.mapper_size_factors())
            .output(layout.mapper_norm_counts())
            .cmd(format!(
                "{rscript} {scripts}/norm_counts_deseq.R {{input0}} {{input1}} {}",
                layout.mapper_norm_counts_dir()
            ))
            .log(s(layout.log_dir.join(mapper).join("norm_counts_deseq.log")))
            .resources(res("norm_counts_deseq"))
            .build(),
    );

    let multiqc = cfg.tool("multiqc");
    let mut multiqc_rule = RuleTemplate::singleton("multiqc");
    for name in samples.names() {
        multiqc_rule = multiqc_rule.input(layout.quant_sf(name));
        multiqc_rule = multiqc_rule.input(layout.flen_dist(name));
        multiqc_rule = multiqc_rule.input(layout.bam(name));
    }
    catalog.push(
        multiqc_rule
            .output(layout.multiqc_report())
            .cmd(format!(
                "{multiqc} -f -o {} {}",
                s(layout.multiqc_dir.clone()),
                s(layout.output_dir.clone())
            ))
            .log(layout.log(&format!("multiqc.{mapper}.log")))
            .resources(res("multiqc"))
            .build(),
    );

    if !analyses.is_empty() {
        add_report_rules(&mut catalog, cfg, branches, layout, analyses, &gtf, &logo, &res);
    }

    catalog
}

fn add_star_rules(
    catalog: &mut Vec<RuleTemplate>,
    cfg: &ConfigFile,
    layout: &Layout,
    gtf: &str,
    genome: &str,
    res: &dyn Fn(&str) -> Resources,
) {
    let star_index = cfg.tool("star_index");
    let star_map = cfg.tool("star_map");
    let gunzip = cfg.tool("gunzip");
    let index_dir = s(layout.star_index_dir.clone());
    let index_file = s(layout.star_index_dir.join("SAindex"));

    let index_res = res("star_index");
    catalog.push(
        RuleTemplate::singleton("star_index")
            .input(gtf)
            .input(genome)
            .input(layout.annotation_stats())
            .output(&index_file)
            .cmd(format!(
                "{star_index} --runMode genomeGenerate --runThreadN {} --genomeDir {index_dir} --genomeFastaFiles {{input1}} --sjdbGTFfile {{input0}}",
                index_res.threads
            ))
            .log(layout.log("star_index.log"))
            .resources(index_res)
            .build(),
    );

    let map_res = res("star_map");
    let prefix = s(layout.mapped_reads_dir.join("{sample}_"));
    let common = format!(
        "--readFilesCommand '{gunzip} -c' --outSAMtype BAM SortedByCoordinate --outFileNamePrefix {prefix}"
    );
    catalog.push(
        RuleTemplate::per_sample("star_map")
            .trimmed_reads()
            .input(&index_file)
            .output(layout.bam("{sample}"))
            .cmd(format!(
                "{star_map} --runThreadN {} --genomeDir {index_dir} --readFilesIn {{input0}} {{input1}} {common}",
                map_res.threads
            ))
            .cmd_single(format!(
                "{star_map} --runThreadN {} --genomeDir {index_dir} --readFilesIn {{input0}} {common}",
                map_res.threads
            ))
            .log(s(layout.log_dir.join("star").join("star_map_{sample}.log")))
            .resources(map_res)
            .build(),
    );
}

fn add_hisat2_rules(
    catalog: &mut Vec<RuleTemplate>,
    cfg: &ConfigFile,
    layout: &Layout,
    genome: &str,
    res: &dyn Fn(&str) -> Resources,
) {
    let hisat2_build = cfg.tool("hisat2-build");
    let hisat2 = cfg.tool("hisat2");
    let samtools = cfg.tool("samtools");
    let prefix = s(layout.hisat2_index_dir.join(format!("{}_index", cfg.mapping.genome_build)));

    let index_res = res("hisat2_index");
    let mut index_rule = RuleTemplate::singleton("hisat2_index")
        .input(genome)
        .input(layout.annotation_stats());
    for file in layout.hisat2_index_files() {
        index_rule = index_rule.output(file);
    }
    catalog.push(
        index_rule
            .cmd(format!(
                "{hisat2_build} -f -p {} --large-index {{input0}} {prefix}",
                index_res.threads
            ))
            .log(layout.log("hisat2_index.log"))
            .resources(index_res)
            .build(),
    );

    let map_res = res("hisat2_map");
    let mut map_rule = RuleTemplate::per_sample("hisat2_map").trimmed_reads();
    for file in layout.hisat2_index_files() {
        map_rule = map_rule.input(file);
    }
    catalog.push(
        map_rule
            .output(layout.bam("{sample}"))
            .cmd(format!(
                "{hisat2} -x {prefix} -p {} -q -1 {{input0}} -2 {{input1}} | {samtools} sort -o {{output0}} -",
                map_res.threads
            ))
            .cmd_single(format!(
                "{hisat2} -x {prefix} -p {} -q -U {{input0}} | {samtools} sort -o {{output0}} -",
                map_res.threads
            ))
            .log(s(layout.log_dir.join("hisat2").join("hisat2_map_{sample}.log")))
            .resources(map_res)
            .build(),
    );
}

fn add_salmon_rules(
    catalog: &mut Vec<RuleTemplate>,
    cfg: &ConfigFile,
    branches: &BranchSelection,
    layout: &Layout,
    samples: &SampleRegistry,
    gtf: &str,
    cdna: &str,
    res: &dyn Fn(&str) -> Resources,
) {
    let salmon_index = cfg.tool("salmon_index");
    let salmon_quant = cfg.tool("salmon_quant");
    let rscript = cfg.tool("Rscript");
    let scripts = s(cfg.locations.scripts_dir.clone());
    let index_dir = s(layout.salmon_index_dir.clone());

    let index_res = res("salmon_index");
    let mut index_rule = RuleTemplate::singleton("salmon_index")
        .input(cdna)
        .input(layout.annotation_stats());
    for file in layout.salmon_index_files() {
        index_rule = index_rule.output(file);
    }
    catalog.push(
        index_rule
            .cmd(format!(
                "{salmon_index} -t {{input0}} -i {index_dir} -p {}",
                index_res.threads
            ))
            .log(s(layout.log_dir.join("salmon").join("salmon_index.log")))
            .resources(index_res)
            .build(),
    );

    let quant_res = res("salmon_quant");
    let outfolder = s(layout.salmon_dir.join("{sample}"));
    let tail = format!("-o {outfolder} --seqBias --gcBias");
    catalog.push(
        RuleTemplate::per_sample("salmon_quant")
            .trimmed_reads()
            .input(gtf)
            .input(layout.salmon_index_marker())
            .output(layout.quant_sf("{sample}"))
            .output(layout.quant_genes_sf("{sample}"))
            .output(layout.flen_dist("{sample}"))
            .cmd(format!(
                "{salmon_quant} -i {index_dir} -l A -p {} -1 {{input0}} -2 {{input1}} {tail} -g {{input2}}",
                quant_res.threads
            ))
            .cmd_single(format!(
                "{salmon_quant} -i {index_dir} -l A -p {} -r {{input0}} {tail} -g {{input1}}",
                quant_res.threads
            ))
            .log(s(layout.log_dir.join("salmon").join("salmon_quant_{sample}.log")))
            .resources(quant_res)
            .build(),
    );

    let mut counts_rule = RuleTemplate::singleton("counts_from_salmon");
    for name in samples.names() {
        counts_rule = counts_rule.input(layout.quant_sf(name));
    }
    for name in samples.names() {
        counts_rule = counts_rule.input(layout.quant_genes_sf(name));
    }
    counts_rule = counts_rule.input(layout.col_data());
    for level in branches.quant.iter() {
        counts_rule = counts_rule.output(layout.salmon_raw_counts(*level));
        counts_rule = counts_rule.output(layout.salmon_tpm_counts(*level));
    }
    catalog.push(
        counts_rule
            .cmd(format!(
                "{rscript} {scripts}/counts_matrix_from_SALMON.R {} {} {}",
                s(layout.salmon_dir.clone()),
                s(layout.counts_dir.clone()),
                layout.col_data()
            ))
            .log(s(layout.log_dir.join("salmon").join("salmon_import_counts.log")))
            .resources(res("counts_from_salmon"))
            .build(),
    );
}

fn add_coverage_rules(
    catalog: &mut Vec<RuleTemplate>,
    cfg: &ConfigFile,
    branches: &BranchSelection,
    layout: &Layout,
    res: &dyn Fn(&str) -> Resources,
) {
    let mapper = branches.mapper.as_str();
    match branches.coverage {
        CoverageTool::BamCoverage => {
            let bamcoverage = cfg.tool("bamCoverage");
            catalog.push(
                RuleTemplate::per_sample("coverage_bamcoverage")
                    .input(layout.bam("{sample}"))
                    .input(layout.bai("{sample}"))
                    .output(s(layout.bigwig_dir.join("{sample}.forward.bw")))
                    .output(s(layout.bigwig_dir.join("{sample}.reverse.bw")))
                    .output(s(layout.bigwig_dir.join("{sample}.bw")))
                    .cmd(format!(
                        "{bamcoverage} -b {{input0}} -o {{output0}} --filterRNAstrand forward && \
                         {bamcoverage} -b {{input0}} -o {{output1}} --filterRNAstrand reverse && \
                         {bamcoverage} -b {{input0}} -o {{output2}}"
                    ))
                    .log(s(layout.log_dir.join(mapper).join("coverage_bamCoverage.{sample}.log")))
                    .resources(res("coverage_bamcoverage"))
                    .build(),
            );
        }
        CoverageTool::Megadepth => {
            let megadepth = cfg.tool("megadepth");
            let cov_res = res("coverage_megadepth");
            let prefix = s(layout.bigwig_dir.join("{sample}"));
            catalog.push(
                RuleTemplate::per_sample("coverage_megadepth")
                    .input(layout.bam("{sample}"))
                    .input(layout.bai("{sample}"))
                    .output(s(layout.bigwig_dir.join("{sample}.all.bw")))
                    .cmd(format!(
                        "{megadepth} {{input0}} --threads {} --bigwig --prefix {prefix}",
                        cov_res.threads
                    ))
                    .log(s(layout.log_dir.join(mapper).join("coverage_megadepth.{sample}.log")))
                    .resources(cov_res)
                    .build(),
            );
        }
    }
}

fn add_report_rules(
    catalog: &mut Vec<RuleTemplate>,
    cfg: &ConfigFile,
    branches: &BranchSelection,
    layout: &Layout,
    analyses: &[AnalysisSpec],
    gtf: &str,
    logo: &str,
    res: &dyn Fn(&str) -> Resources,
) {
    let rscript = cfg.tool("Rscript");
    let scripts = s(cfg.locations.scripts_dir.clone());
    let mapper = branches.mapper.as_str();

    let report_cmd = |counts: &str, prefix: &str, workdir: &str| {
        format!(
            "{rscript} {scripts}/runDeseqReport.R \
             --logo={{input1}} --prefix='{prefix}' \
             --reportFile={scripts}/deseqReport.Rmd \
             --countDataFile={counts} --colDataFile={{input3}} --gtfFile={{input0}} \
             --caseSampleGroups='{{case}}' --controlSampleGroups='{{control}}' \
             --covariates='{{covariates}}' --workdir={workdir} \
             --description='{{description}}' --selfContained='{{self_contained}}'"
        )
    };

    let workdir = s(layout.report_mapper_dir.clone());
    catalog.push(
        RuleTemplate::per_analysis("deseq_report_mapper")
            .input(gtf)
            .input(logo)
            .input(layout.mapper_counts())
            .input(layout.col_data())
            .output(layout.mapper_report_html("{analysis}"))
            .output(layout.mapper_results_tsv("{analysis}"))
            .cmd(report_cmd("{input2}", "{analysis}", &workdir))
            .log(s(layout.log_dir.join(mapper).join("{analysis}.report.log")))
            .resources(res("deseq_report_mapper"))
            .build(),
    );

    let mut collate = RuleTemplate::singleton("collate_deseq_mapper");
    for analysis in analyses {
        collate = collate.input(layout.mapper_results_tsv(&analysis.name));
    }
    catalog.push(
        collate
            .output(layout.mapper_collated_results())
            .cmd(format!(
                "{rscript} {scripts}/collate_deseq_results.R {mapper} {workdir} {workdir}"
            ))
            .log(s(layout.log_dir.join(mapper).join("collate_deseq.report.log")))
            .resources(res("collate_deseq_mapper"))
            .build(),
    );

    let salmon_workdir = s(layout.report_salmon_dir.clone());
    for level in branches.quant.iter().copied() {
        let rule = format!("deseq_report_salmon_{}", level.as_str());
        catalog.push(
            RuleTemplate::per_analysis(&rule)
                .input(gtf)
                .input(logo)
                .input(layout.salmon_raw_counts(level))
                .input(layout.col_data())
                .output(layout.salmon_report_html("{analysis}", level))
                .output(layout.salmon_results_tsv("{analysis}", level))
                .cmd(report_cmd(
                    "{input2}",
                    &format!("{{analysis}}.salmon.{}", level.as_str()),
                    &salmon_workdir,
                ))
                .log(s(layout
                    .log_dir
                    .join("salmon")
                    .join(format!("{{analysis}}.report.salmon.{}.log", level.as_str()))))
                .resources(res(&rule))
                .build(),
        );

        let collate_rule = format!("collate_deseq_salmon_{}", level.as_str());
        let mut collate = RuleTemplate::singleton(&collate_rule);
        for analysis in analyses {
            collate = collate.input(layout.salmon_results_tsv(&analysis.name, level));
        }
        catalog.push(
            collate
                .output(layout.salmon_collated_results(level))
                .cmd(format!(
                    "{rscript} {scripts}/collate_deseq_results.R {} {salmon_workdir} {salmon_workdir}",
                    level.as_str()
                ))
                .log(s(layout
                    .log_dir
                    .join("salmon")
                    .join(format!("collate_{}_deseq.report.log", level.as_str()))))
                .resources(res(&collate_rule))
                .build(),
        );
    }
}
