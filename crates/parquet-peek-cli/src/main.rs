//! Preview a Parquet file stored in S3: shape, memory estimate, column
//! statistics and the first rows.

mod error;
mod logging;
mod report;

use std::{future::Future, io::Write, time::Duration};

use clap::{Parser, ValueEnum, builder::TypedValueParser as _};
use log::{debug, error, info};
use parquet_peek_core::{
    ClientConfig, CredentialStrategy, InspectOptions, Locator, ObjectSource, PeekError,
    RetryPolicy,
    client::{DEFAULT_PROFILE, DEFAULT_REGION},
    connect, inspect,
    summary::{DEFAULT_SHOW_ROWS, MAX_CELL_WIDTH},
};

use crate::{
    error::{CliError, CliResult},
    report::write_report,
};

/// Exit status after Ctrl-C, following the shell convention for SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AwsMode {
    /// Named profile from the shared AWS config files
    Profile,
    /// Credentials provided by the environment (instance or task role)
    Role,
}

#[derive(Debug, Parser)]
#[command(
    name = "parquet-peek",
    version,
    about = "Preview a Parquet file stored in S3",
    after_help = "Examples:\n  \
        parquet-peek s3://my-bucket/data/file.parquet\n  \
        parquet-peek s3://my-bucket/data/file.parquet --rows 20\n  \
        parquet-peek s3://my-bucket/data/file.parquet --aws-mode role\n  \
        parquet-peek s3://my-bucket/data/file.parquet --aws-profile analytics"
)]
struct Cli {
    /// Object to inspect, as s3://bucket/key
    #[arg(value_name = "S3_URL")]
    url: String,

    /// Number of rows to preview
    #[arg(short = 'r', long = "rows", default_value_t = DEFAULT_SHOW_ROWS)]
    rows: usize,

    /// How AWS credentials are obtained
    #[arg(long = "aws-mode", value_enum, default_value_t = AwsMode::Profile)]
    aws_mode: AwsMode,

    /// Profile name (only used with --aws-mode profile)
    #[arg(long = "aws-profile", env = "AWS_PROFILE", default_value = DEFAULT_PROFILE)]
    aws_profile: String,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// S3-compatible endpoint; switches to path-style addressing
    #[arg(long = "endpoint-url")]
    endpoint_url: Option<String>,

    /// Per-operation timeout in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Retries for network failures while downloading (0 disables)
    #[arg(long = "max-retries", default_value_t = 0)]
    max_retries: u32,

    /// Maximum width of a preview cell
    #[arg(
        long = "max-col-width",
        default_value_t = MAX_CELL_WIDTH,
        value_parser = clap::value_parser!(u16).range(4..).map(usize::from)
    )]
    max_col_width: usize,

    /// Enable debug diagnostics
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn strategy(&self) -> CredentialStrategy {
        match self.aws_mode {
            AwsMode::Profile => CredentialStrategy::profile(self.aws_profile.clone()),
            AwsMode::Role => CredentialStrategy::AmbientRole,
        }
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }

    fn inspect_options(&self) -> InspectOptions {
        InspectOptions {
            show_rows: self.rows,
            max_cell_width: self.max_col_width,
            retry: RetryPolicy::with_max_retries(self.max_retries),
        }
    }
}

async fn run(cli: &Cli) -> CliResult<()> {
    let locator = Locator::parse(&cli.url).map_err(PeekError::from)?;
    info!(
        "Parsed S3 URL: bucket={}, key={}",
        locator.container(),
        locator.key()
    );

    let strategy = cli.strategy();
    debug!("Credential strategy: {strategy}");
    let client = connect(&strategy, &cli.client_config())
        .await
        .map_err(PeekError::from)?;

    inspect_and_report(&client, &locator, &cli.inspect_options(), &mut std::io::stdout()).await
}

/// Run the pipeline against `source` and write the report to `out`. Nothing
/// is written unless the whole pipeline succeeds.
async fn inspect_and_report<S, W>(
    source: &S,
    locator: &Locator,
    options: &InspectOptions,
    out: &mut W,
) -> CliResult<()>
where
    S: ObjectSource + ?Sized,
    W: Write,
{
    let inspection = inspect(source, locator, options).await?;
    write_report(&inspection, out)
}

/// Drive `work` until it finishes or `interrupt` fires, whichever comes first.
/// A pending interrupt wins over work that is ready in the same poll.
async fn until_interrupted<F, I>(work: F, interrupt: I) -> Option<F::Output>
where
    F: Future,
    I: Future,
{
    tokio::select! {
        biased;
        _ = interrupt => None,
        res = work => Some(res),
    }
}

fn report_failure(err: &CliError) {
    match err.kind() {
        Some(kind) => error!("{kind}: {err}"),
        None => error!("{err}"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let outcome = until_interrupted(run(&cli), tokio::signal::ctrl_c()).await;

    match outcome {
        Some(Ok(())) => info!("Completed successfully"),
        Some(Err(e)) => {
            report_failure(&e);
            std::process::exit(1);
        }
        None => {
            info!("Interrupted by user");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parquet::arrow::ArrowWriter;
    use parquet_peek_core::StoreFailure;
    use tokio::sync::oneshot;

    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// Never answers a read.
    struct Stalled;

    #[async_trait]
    impl ObjectSource for Stalled {
        fn describe(&self) -> String {
            "stalled store".to_string()
        }

        async fn probe(&self) -> Result<(), StoreFailure> {
            Ok(())
        }

        async fn get_object(&self, _locator: &Locator) -> Result<Bytes, StoreFailure> {
            std::future::pending().await
        }
    }

    /// Serves one payload and signals once it has been handed out.
    struct Signalling {
        payload: Bytes,
        served: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl ObjectSource for Signalling {
        fn describe(&self) -> String {
            "signalling store".to_string()
        }

        async fn probe(&self) -> Result<(), StoreFailure> {
            Ok(())
        }

        async fn get_object(&self, _locator: &Locator) -> Result<Bytes, StoreFailure> {
            let mut served = self
                .served
                .lock()
                .map_err(|e| StoreFailure::transport(e.to_string()))?;
            if let Some(tx) = served.take() {
                let _ = tx.send(());
            }
            Ok(self.payload.clone())
        }
    }

    fn large_parquet(rows: i64) -> Result<Bytes, Box<dyn std::error::Error>> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("label", DataType::Utf8, true),
        ]));
        let labels: Vec<Option<String>> = (0..rows).map(|i| Some(format!("row-{i}"))).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from_iter_values(0..rows)) as ArrayRef,
                Arc::new(StringArray::from(labels)),
            ],
        )?;
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(Bytes::from(buf))
    }

    #[tokio::test]
    async fn interrupt_during_download_writes_nothing() -> TestResult {
        let locator = Locator::parse("s3://bucket1/data/2024/file.parquet")?;
        let mut out = Vec::new();

        let outcome = until_interrupted(
            inspect_and_report(&Stalled, &locator, &InspectOptions::default(), &mut out),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await;

        assert!(outcome.is_none());
        assert!(out.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn interrupt_during_decode_writes_nothing() -> TestResult {
        let (tx, rx) = oneshot::channel();
        let source = Signalling {
            payload: large_parquet(200_000)?,
            served: Mutex::new(Some(tx)),
        };
        let locator = Locator::parse("s3://bucket1/data/2024/file.parquet")?;
        let mut out = Vec::new();

        // The interrupt fires as soon as the download has completed, while
        // the payload is still being decoded.
        let outcome = until_interrupted(
            inspect_and_report(&source, &locator, &InspectOptions::default(), &mut out),
            rx,
        )
        .await;

        assert!(outcome.is_none());
        assert!(out.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn uninterrupted_run_writes_the_report() -> TestResult {
        let (tx, _rx) = oneshot::channel();
        let source = Signalling {
            payload: large_parquet(25)?,
            served: Mutex::new(Some(tx)),
        };
        let locator = Locator::parse("s3://bucket1/data/2024/file.parquet")?;
        let mut out = Vec::new();

        let outcome = until_interrupted(
            inspect_and_report(&source, &locator, &InspectOptions::default(), &mut out),
            std::future::pending::<()>(),
        )
        .await;

        assert!(matches!(outcome, Some(Ok(()))));
        let report = String::from_utf8(out)?;
        assert!(report.contains("Shape: 25 rows × 2 columns"));
        assert!(report.contains("... and 15 more rows"));
        Ok(())
    }

    #[tokio::test]
    async fn pending_interrupt_beats_ready_work() {
        let outcome = until_interrupted(std::future::ready(7), std::future::ready(())).await;
        assert_eq!(outcome, None);
    }

    #[test]
    fn defaults_match_documented_values() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["parquet-peek", "s3://b/k.parquet"])?;

        assert_eq!(cli.rows, 10);
        assert_eq!(cli.aws_mode, AwsMode::Profile);
        assert_eq!(cli.max_retries, 0);
        assert_eq!(cli.max_col_width, 50);
        assert!(!cli.verbose);
        assert_eq!(cli.inspect_options().retry, RetryPolicy::default());
        Ok(())
    }

    #[test]
    fn role_mode_ignores_profile() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "parquet-peek",
            "s3://b/k.parquet",
            "--aws-mode",
            "role",
            "--aws-profile",
            "analytics",
        ])?;

        assert_eq!(cli.strategy(), CredentialStrategy::AmbientRole);
        Ok(())
    }

    #[test]
    fn options_flow_into_pipeline_settings() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "parquet-peek",
            "s3://b/k.parquet",
            "-r",
            "3",
            "--region",
            "eu-west-1",
            "--endpoint-url",
            "http://localhost:9000",
            "--timeout-ms",
            "1500",
            "--max-retries",
            "2",
            "--max-col-width",
            "12",
        ])?;

        let config = cli.client_config();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));

        let options = cli.inspect_options();
        assert_eq!(options.show_rows, 3);
        assert_eq!(options.max_cell_width, 12);
        assert_eq!(options.retry.max_retries, 2);
        Ok(())
    }

    #[test]
    fn rejects_tiny_cell_width() {
        let res = Cli::try_parse_from(["parquet-peek", "s3://b/k.parquet", "--max-col-width", "2"]);
        assert!(res.is_err());
    }
}
