use crate::error::{ErrorKind, Result};
use crate::{Converter, Lod, ProjectMetadata};
use async_trait::async_trait;
use cjifc_model::Model;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;
use upon::{Engine, Template};

/// Converter program looked up on `PATH` when none is configured.
pub const DEFAULT_PROGRAM: &str = "cityjson2ifc";

/// Argument templates passed to [`DEFAULT_PROGRAM`].
pub const DEFAULT_ARGS: [&str; 12] = [
    "--lod",
    "{{ lod }}",
    "--name-project",
    "{{ name_project }}",
    "--name-site",
    "{{ name_site }}",
    "--name-person-family",
    "{{ person_family }}",
    "--name-person-given",
    "{{ person_given }}",
    "{{ input }}",
    "{{ output }}",
];

// Only the end of stderr is kept in errors; converters can be chatty.
const STDERR_TAIL_BYTES: usize = 2048;

/// Runs an external converter program once per conversion.
///
/// Each argument is an [upon] template rendered with the variables `input`,
/// `output`, `lod`, `name_project`, `name_site`, `person_family` and
/// `person_given`. The program must exit successfully *and* leave a file at
/// `output`, otherwise the conversion counts as failed.
///
/// The child is killed if the conversion future is dropped, so wrapping a
/// call in a timeout really stops the work.
pub struct CommandConverter {
    program: PathBuf,
    engine: Engine<'static>,
    args: Vec<Template<'static>>,
}

impl CommandConverter {
    /// Locate `program` (a bare name is searched on `PATH`) and compile the
    /// argument templates, failing fast on either.
    pub fn new(program: impl AsRef<Path>, args: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let requested = program.as_ref();
        let program = which::which(requested)
            .or_raise(|| ErrorKind::ConverterNotFound(requested.display().to_string()))?;
        let engine = Engine::new();
        let args = args
            .into_iter()
            .map(|arg| engine.compile(arg.into()).or_raise(|| ErrorKind::Template))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(program = %program.display(), args = args.len(), "Converter program located");
        Ok(Self { program, engine, args })
    }

    fn render_args(&self, input: &Path, lod: &Lod, project: &ProjectMetadata, output: &Path) -> Result<Vec<String>> {
        let values = upon::value! {
            input: input.display().to_string(),
            output: output.display().to_string(),
            lod: lod.as_str(),
            name_project: &project.name_project,
            name_site: &project.name_site,
            person_family: &project.person_family,
            person_given: &project.person_given,
        };
        self.args
            .iter()
            .map(|template| template.render(&self.engine, &values).to_string().or_raise(|| ErrorKind::Template))
            .collect()
    }
}

#[async_trait]
impl Converter for CommandConverter {
    #[instrument(skip_all, fields(source = %model.source().display(), %lod))]
    async fn convert(&self, model: &Model, lod: &Lod, project: &ProjectMetadata, output: &Path) -> Result<()> {
        let args = self.render_args(model.source(), lod, project, output)?;
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Io)?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
            let tail = stderr.get(start..).unwrap_or(stderr.as_ref()).trim();
            exn::bail!(ErrorKind::ConversionFailed(format!("{} ({tail})", result.status)));
        }
        if !tokio::fs::try_exists(output).await.or_raise(|| ErrorKind::Io)? {
            exn::bail!(ErrorKind::ConversionFailed(format!("no artifact written to {}", output.display())));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use cjifc_model::SchemaVersion;
    use std::time::Duration;

    fn model(source: &Path) -> Model {
        Model {
            source: source.to_path_buf(),
            version: SchemaVersion::V2_0,
            city_objects: 1,
            vertices: 0,
        }
    }

    #[test]
    fn missing_program() {
        let err = CommandConverter::new("definitely-not-a-converter-binary", DEFAULT_ARGS).err().unwrap();
        assert!(matches!(&*err, ErrorKind::ConverterNotFound(_)));
    }

    #[test]
    fn invalid_template() {
        let err = CommandConverter::new("sh", ["{{ unclosed"]).err().unwrap();
        assert_eq!(*err, ErrorKind::Template);
    }

    #[test]
    fn renders_all_variables() {
        let converter = CommandConverter::new("sh", DEFAULT_ARGS).unwrap();
        let lod: Lod = "1.3".parse().unwrap();
        let args = converter
            .render_args(Path::new("in.city.json"), &lod, &ProjectMetadata::default(), Path::new("in-1.3.ifc"))
            .unwrap();
        assert_eq!(
            args,
            [
                "--lod",
                "1.3",
                "--name-project",
                "3DBAG Project",
                "--name-site",
                "3DBAG Site",
                "--name-person-family",
                "3Dgeoinfo",
                "--name-person-given",
                "3DGI/",
                "in.city.json",
                "in-1.3.ifc",
            ]
        );
    }

    #[tokio::test]
    async fn successful_conversion_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tile-2.2.ifc");
        let converter =
            CommandConverter::new("sh", ["-c", r#"printf 'ISO-10303-21;%s' "$1" > "$2""#, "sh", "{{ lod }}", "{{ output }}"])
                .unwrap();
        let lod: Lod = "2.2".parse().unwrap();
        converter.convert(&model(&dir.path().join("tile.city.json")), &lod, &ProjectMetadata::default(), &output).await.unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "ISO-10303-21;2.2");
    }

    #[tokio::test]
    async fn failing_program_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let converter = CommandConverter::new("sh", ["-c", "echo 'invalid geometry' >&2; exit 3"]).unwrap();
        let lod: Lod = "0".parse().unwrap();
        let err = converter
            .convert(&model(Path::new("tile.city.json")), &lod, &ProjectMetadata::default(), &dir.path().join("x.ifc"))
            .await
            .unwrap_err();
        match &*err {
            ErrorKind::ConversionFailed(reason) => assert!(reason.contains("invalid geometry"), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_artifact_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = CommandConverter::new("sh", ["-c", "exit 0"]).unwrap();
        let lod: Lod = "0".parse().unwrap();
        let err = converter
            .convert(&model(Path::new("tile.city.json")), &lod, &ProjectMetadata::default(), &dir.path().join("x.ifc"))
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::ConversionFailed(_)));
    }

    #[tokio::test]
    async fn dropped_conversion_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("slow.ifc");
        let converter = CommandConverter::new("sh", ["-c", r#"sleep 1; touch "$1""#, "sh", "{{ output }}"]).unwrap();
        let lod: Lod = "0".parse().unwrap();
        let source = model(Path::new("tile.city.json"));
        let project = ProjectMetadata::default();
        let attempt = converter.convert(&source, &lod, &project, &output);
        let timed_out = tokio::time::timeout(Duration::from_millis(100), attempt).await;
        assert!(timed_out.is_err());
        // Well past the point where a surviving child would have written it.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!output.exists());
    }
}
