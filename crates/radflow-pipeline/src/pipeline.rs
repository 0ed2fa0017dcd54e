//! 流水线编排
//!
//! 读取验证 -> 规范化 -> 检测 -> 提取患者信息 -> 生成报告 -> 写出结果。
//! 各阶段严格顺序执行，任何失败都收敛为 [`PipelineResult::Failed`]，`process` 本身不返回错误。

use crate::artifacts::ArtifactWriter;
use crate::config::PipelineConfig;
use crate::result::{FailureReason, OutputFiles, PipelineFailure, PipelineResult, PipelineSuccess};
use crate::state_machine::{PipelineStage, PipelineStateMachine, StageEvent};
use chrono::Utc;
use radflow_core::utils::generate_run_id;
use radflow_core::{
    CanonicalImage, Detection, PatientContext, RadflowError, RawStudy, Result, SourceKind,
};
use radflow_detection::{render_detections, wrap_detections, Detector};
use radflow_dicom::{ImageNormalizer, StudyReader, StudyValidator, ValidationResult};
use radflow_report::{render_text_report, Report, ReportComposer, ReportValidator, TemplateTable};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 影像分析流水线
pub struct Pipeline {
    reader: StudyReader,
    validator: StudyValidator,
    normalizer: ImageNormalizer,
    detector: Arc<dyn Detector>,
    composer: ReportComposer,
    report_validator: ReportValidator,
    state_machine: PipelineStateMachine,
    config: PipelineConfig,
}

impl Pipeline {
    /// 使用内置模板创建流水线
    pub fn new(detector: Arc<dyn Detector>, config: PipelineConfig) -> Self {
        Self::with_templates(detector, config, TemplateTable::builtin())
    }

    /// 使用指定模板表创建流水线
    pub fn with_templates(
        detector: Arc<dyn Detector>,
        config: PipelineConfig,
        templates: TemplateTable,
    ) -> Self {
        let composer = ReportComposer::new(templates).with_location(config.location.clone());
        let report_validator = ReportValidator::new(config.strict_report_validation);

        Self {
            reader: StudyReader::new(),
            validator: StudyValidator::new(),
            normalizer: ImageNormalizer::new(),
            detector,
            composer,
            report_validator,
            state_machine: PipelineStateMachine::new(),
            config,
        }
    }

    /// 按配置创建流水线，配置了 `templates_path` 时从文件加载模板表
    pub async fn from_config(detector: Arc<dyn Detector>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let templates = match &config.templates_path {
            Some(path) => TemplateTable::from_json_file(path).await?,
            None => TemplateTable::builtin(),
        };

        Ok(Self::with_templates(detector, config, templates))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 处理一个检查，结果文件写入 `output_dir`
    pub async fn process(&self, study: RawStudy, output_dir: impl AsRef<Path>) -> PipelineResult {
        self.run(generate_run_id(), &study, output_dir.as_ref()).await
    }

    async fn run(&self, run_id: String, study: &RawStudy, output_dir: &Path) -> PipelineResult {
        info!("运行 {} 开始处理检查: {}", run_id, study.describe());
        let mut progress = Progress::new(&self.state_machine);

        match self.execute(&run_id, study, output_dir, &mut progress).await {
            Ok(success) => {
                info!(
                    "运行 {} 处理完成，耗时 {:.3}s，检测数 {}",
                    run_id,
                    success.processing_time_seconds,
                    success.detections.len()
                );
                PipelineResult::Completed(success)
            }
            Err(failure) => {
                let failed_stage = progress.fail();
                error!(
                    "运行 {} 处理失败 ({:?}) 于阶段 {:?}: {}",
                    run_id, failure.reason, failed_stage, failure.message
                );
                PipelineResult::Failed(PipelineFailure {
                    run_id,
                    failed_at: Utc::now(),
                    reason: failure.reason,
                    message: failure.message,
                    failed_stage,
                    validation: failure.validation,
                })
            }
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        study: &RawStudy,
        output_dir: &Path,
        progress: &mut Progress<'_>,
    ) -> std::result::Result<PipelineSuccess, StageFailure> {
        let started = Instant::now();

        // 1. 读取与验证
        progress.advance(StageEvent::Started)?;
        let parsed = match self.reader.read(study).await {
            Ok(parsed) => parsed,
            Err(e) => {
                let message = e.to_string();
                return Err(StageFailure::invalid_input(
                    message.clone(),
                    ValidationResult::failed(message),
                ));
            }
        };

        let validation = self.validator.validate(&parsed);
        if !validation.is_valid {
            return Err(StageFailure::invalid_input(
                invalid_input_message(study.kind()).to_string(),
                validation,
            ));
        }
        if validation.has_warnings() {
            warn!("{}: {:?}", validation.get_summary(), validation.warnings);
        }
        let metadata = parsed.metadata();
        progress.advance(StageEvent::Validated)?;

        // 2. 规范化
        let image = self
            .normalizer
            .normalize(&parsed)
            .map_err(StageFailure::processing)?;
        progress.advance(StageEvent::Normalized)?;

        // 3. 检测
        let detections = self.detect(&image).await.map_err(StageFailure::processing)?;
        progress.advance(StageEvent::Detected)?;

        // 4. 患者信息
        let patient = PatientContext::from(&metadata);
        debug!("患者信息: {:?}", patient);
        progress.advance(StageEvent::ContextExtracted)?;

        // 5. 报告
        let report = self
            .composer
            .compose(&detections, &patient)
            .map_err(StageFailure::processing)?;
        let report_validation = self.report_validator.validate(&report, &detections);
        progress.advance(StageEvent::Composed)?;

        let processing_time_seconds = started.elapsed().as_secs_f64();

        // 写出结果文件
        let writer = ArtifactWriter::new(output_dir);
        let output_files = self
            .write_artifacts(&writer, &image, &detections, &report, &patient)
            .await
            .map_err(StageFailure::processing)?;

        let success = PipelineSuccess {
            run_id: run_id.to_string(),
            completed_at: Utc::now(),
            processing_time_seconds,
            dicom_metadata: metadata,
            patient_info: patient,
            detections,
            report,
            validation: report_validation,
            output_files,
        };

        writer
            .write_json(
                &PipelineResult::Completed(success.clone()),
                &self.config.artifacts.report_json,
            )
            .await
            .map_err(StageFailure::processing)?;
        progress.advance(StageEvent::Persisted)?;

        Ok(success)
    }

    async fn detect(&self, image: &CanonicalImage) -> Result<Vec<Detection>> {
        let threshold = self.config.confidence_threshold;
        info!(
            "调用检测器 {}，图像 {}x{}，阈值 {}",
            self.detector.name(),
            image.width(),
            image.height(),
            threshold
        );

        let inference = self.detector.detect(image, threshold);
        let raw = match self.config.inference_timeout() {
            Some(limit) => tokio::time::timeout(limit, inference).await.map_err(|_| {
                RadflowError::Timeout(format!(
                    "检测器 {} 在 {}ms 内未返回",
                    self.detector.name(),
                    limit.as_millis()
                ))
            })??,
            None => inference.await?,
        };

        let detections = wrap_detections(raw);
        info!("检测完成，共 {} 个结果", detections.len());
        Ok(detections)
    }

    async fn write_artifacts(
        &self,
        writer: &ArtifactWriter,
        image: &CanonicalImage,
        detections: &[Detection],
        report: &Report,
        patient: &PatientContext,
    ) -> Result<OutputFiles> {
        let names = &self.config.artifacts;
        writer.ensure_dir().await?;

        let canonical_image = writer.write_canonical(image, &names.canonical_image).await?;

        let overlay = render_detections(image, detections);
        let detection_visualization = writer
            .write_rgb(&overlay, &names.detection_visualization)
            .await?;

        let report_text = writer
            .write_text(&render_text_report(report, patient), &names.report_text)
            .await?;

        info!("结果文件已写入 {:?}", writer.base_path());

        Ok(OutputFiles {
            canonical_image,
            detection_visualization,
            report_text,
            report_json: writer.base_path().join(&names.report_json),
        })
    }
}

fn invalid_input_message(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Dicom => "Invalid DICOM file",
        SourceKind::Raster => "Invalid raster image",
    }
}

/// 单次运行的阶段进度
struct Progress<'a> {
    machine: &'a PipelineStateMachine,
    stage: PipelineStage,
}

impl<'a> Progress<'a> {
    fn new(machine: &'a PipelineStateMachine) -> Self {
        Self {
            machine,
            stage: PipelineStage::Pending,
        }
    }

    fn advance(&mut self, event: StageEvent) -> std::result::Result<(), StageFailure> {
        let next = self
            .machine
            .transition(&self.stage, &event)
            .map_err(StageFailure::processing)?;
        debug!("阶段 {:?} -> {:?}", self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// 进入失败状态，返回出错时所处的阶段
    fn fail(&mut self) -> PipelineStage {
        let failed_stage = self.stage;
        if let Ok(next) = self.machine.transition(&self.stage, &StageEvent::Failed) {
            self.stage = next;
        }
        failed_stage
    }
}

struct StageFailure {
    reason: FailureReason,
    message: String,
    validation: Option<ValidationResult>,
}

impl StageFailure {
    fn invalid_input(message: String, validation: ValidationResult) -> Self {
        Self {
            reason: FailureReason::InvalidInput,
            message,
            validation: Some(validation),
        }
    }

    fn processing(err: RadflowError) -> Self {
        Self {
            reason: FailureReason::ProcessingError,
            message: err.to_string(),
            validation: None,
        }
    }
}
