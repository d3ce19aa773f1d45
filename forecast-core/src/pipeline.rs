use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{debug, error, warn};

use crate::{
    config::Config,
    decoder::{DecodeBuffer, StreamingDecoder},
    error::ForecastError,
    fields::FieldNameTable,
    icon::IconLoader,
    model::{CurrentForecast, FiveDayForecast, ForecastMode},
    reader::{CurrentConditionsReader, FiveDayReader},
    request::request_url,
    source::ForecastSource,
};

/// Identifies one `start` call and its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchId(pub u64);

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The result of one fetch, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    SingleDay { id: FetchId, forecast: CurrentForecast },
    FiveDay { id: FetchId, forecast: FiveDayForecast },
}

impl Completion {
    /// An all-absent result for `mode`.
    pub fn empty(id: FetchId, mode: ForecastMode) -> Self {
        match mode {
            ForecastMode::SingleDay => {
                Completion::SingleDay { id, forecast: CurrentForecast::default() }
            }
            ForecastMode::FiveDay => {
                Completion::FiveDay { id, forecast: FiveDayForecast::default() }
            }
        }
    }

    pub fn id(&self) -> FetchId {
        match self {
            Completion::SingleDay { id, .. } | Completion::FiveDay { id, .. } => *id,
        }
    }
}

/// Synchronous fetch-and-decode of a single request.
///
/// Each call opens its own stream and decoder; nothing is shared between
/// calls except read-only configuration and the collaborators.
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    fields: FieldNameTable,
    api_key: Option<String>,
    icon_sample_size: Option<u32>,
    source: Arc<dyn ForecastSource>,
    icons: Arc<dyn IconLoader>,
}

impl ForecastPipeline {
    pub fn new(
        config: &Config,
        source: Arc<dyn ForecastSource>,
        icons: Arc<dyn IconLoader>,
    ) -> Self {
        Self {
            fields: config.fields.clone(),
            api_key: config.api_key(),
            icon_sample_size: config.icon_sample_size,
            source,
            icons,
        }
    }

    /// Fetch and decode current conditions into `out`.
    pub fn fetch_current(
        &self,
        zipcode: &str,
        out: &mut CurrentForecast,
    ) -> Result<(), ForecastError> {
        let reader =
            CurrentConditionsReader::new(&self.fields, self.icons.as_ref(), self.icon_sample_size)?;
        let url = self.url(zipcode, ForecastMode::SingleDay)?;

        let mut buffer = DecodeBuffer::new();
        let mut decoder = StreamingDecoder::new(self.source.open(&url)?, &mut buffer);
        reader.read(&mut decoder, out)
    }

    /// Fetch and decode the five-day outlook into `out`.
    pub fn fetch_five_day(
        &self,
        zipcode: &str,
        out: &mut FiveDayForecast,
    ) -> Result<(), ForecastError> {
        let reader = FiveDayReader::new(&self.fields, self.icons.as_ref())?;
        let url = self.url(zipcode, ForecastMode::FiveDay)?;

        let mut buffer = DecodeBuffer::new();
        let mut decoder = StreamingDecoder::new(self.source.open(&url)?, &mut buffer);
        reader.read(&mut decoder, out)
    }

    fn url(&self, zipcode: &str, mode: ForecastMode) -> Result<reqwest::Url, ForecastError> {
        request_url(&self.fields, zipcode, mode, self.api_key.as_deref())
    }

    /// Run one fetch to completion. Errors are logged and whatever was
    /// decoded before them is returned. A panic inside a collaborator is
    /// treated the same way.
    pub fn run(&self, id: FetchId, zipcode: &str, mode: ForecastMode) -> Completion {
        debug!(fetch = %id, zipcode, %mode, "fetch started");

        let (completion, outcome) = match mode {
            ForecastMode::SingleDay => {
                let mut forecast = CurrentForecast::default();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.fetch_current(zipcode, &mut forecast)
                }));
                (Completion::SingleDay { id, forecast }, outcome)
            }
            ForecastMode::FiveDay => {
                let mut forecast = FiveDayForecast::default();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.fetch_five_day(zipcode, &mut forecast)
                }));
                (Completion::FiveDay { id, forecast }, outcome)
            }
        };

        match outcome {
            Ok(Ok(())) => debug!(fetch = %id, "fetch finished"),
            Ok(Err(error)) => warn!(
                fetch = %id,
                zipcode,
                %mode,
                kind = error.kind(),
                %error,
                "forecast fetch failed; delivering partial result"
            ),
            Err(payload) => error!(
                fetch = %id,
                zipcode,
                %mode,
                panic = panic_message(&*payload),
                "forecast fetch panicked; delivering partial result"
            ),
        }

        completion
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fields::FieldKey,
        model::Icon,
        source::HttpSource,
        testing::{
            RecordingIcons, StaticSource, capture_logs, five_day_document, single_day_document,
        },
    };
    use std::net::TcpListener;

    fn build(config: &Config, body: String) -> (ForecastPipeline, Arc<StaticSource>) {
        let source = Arc::new(StaticSource::new(body));
        let icons = Arc::new(RecordingIcons::default());
        let pipeline = ForecastPipeline::new(config, source.clone(), icons);
        (pipeline, source)
    }

    #[test]
    fn single_day_run_decodes_current_conditions() {
        let (pipeline, source) = build(&Config::default(), single_day_document());

        let completion = pipeline.run(FetchId(1), "10001", ForecastMode::SingleDay);
        let Completion::SingleDay { id, forecast } = completion else {
            panic!("expected single-day completion");
        };

        assert_eq!(id, FetchId(1));
        assert_eq!(forecast.temperature.as_deref(), Some("72"));
        assert!(forecast.icon.is_some());

        let opened = source.opened();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].as_str().contains("q=10001&num_of_days=1&format=json"));
    }

    #[test]
    fn five_day_run_decodes_days() {
        let (pipeline, _source) =
            build(&Config::default(), five_day_document(&["2024-03-04", "2024-03-05"]));

        let completion = pipeline.run(FetchId(2), "10001", ForecastMode::FiveDay);
        let Completion::FiveDay { forecast, .. } = completion else {
            panic!("expected five-day completion");
        };

        assert_eq!(forecast.populated(), 2);
    }

    #[test]
    fn api_key_is_appended_to_request() {
        let mut config = Config::default();
        config.set_api_key("SECRET".to_string());
        let (pipeline, source) = build(&config, single_day_document());

        pipeline.run(FetchId(3), "10001", ForecastMode::SingleDay);
        assert!(source.opened()[0].as_str().ends_with("&key=SECRET"));
    }

    #[test]
    fn unresolved_key_aborts_before_opening_stream() {
        let mut config = Config::default();
        config.fields.remove(FieldKey::Humidity);
        let (pipeline, source) = build(&config, single_day_document());

        let mut out = CurrentForecast::default();
        let err = pipeline.fetch_current("10001", &mut out).unwrap_err();

        assert!(matches!(err, ForecastError::UnresolvedResourceKey(FieldKey::Humidity)));
        assert!(out.is_empty());
        assert!(source.opened().is_empty());
        assert_eq!(
            pipeline.run(FetchId(4), "10001", ForecastMode::SingleDay),
            Completion::empty(FetchId(4), ForecastMode::SingleDay)
        );
    }

    #[test]
    fn malformed_url_yields_empty_completion() {
        let (pipeline, source) = build(&Config::default(), five_day_document(&["2024-03-04"]));

        let completion = pipeline.run(FetchId(5), "10001&x", ForecastMode::FiveDay);
        assert_eq!(completion, Completion::empty(FetchId(5), ForecastMode::FiveDay));
        assert!(source.opened().is_empty());
    }

    #[test]
    fn malformed_document_keeps_partial_result() {
        let body = r#"{"data": {"current_condition": [{"temp_F": "72", "humidity": }]}}"#;
        let (pipeline, _source) = build(&Config::default(), body.to_string());

        let mut out = CurrentForecast::default();
        let err = pipeline.fetch_current("10001", &mut out).unwrap_err();

        assert_eq!(err.kind(), "MalformedDocument");
        assert_eq!(out.temperature.as_deref(), Some("72"));
        assert_eq!(out.humidity, None);
    }

    #[test]
    fn unreachable_host_logs_one_transport_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = Config::default();
        config.fields.insert(FieldKey::UrlPrefix, format!("http://127.0.0.1:{port}/weather?q="));
        let pipeline = ForecastPipeline::new(
            &config,
            Arc::new(HttpSource::new()),
            Arc::new(RecordingIcons::default()),
        );

        let (completion, logs) =
            capture_logs(|| pipeline.run(FetchId(6), "10001", ForecastMode::SingleDay));

        assert_eq!(completion, Completion::empty(FetchId(6), ForecastMode::SingleDay));
        assert_eq!(logs.matches("TransportFailure").count(), 1, "{logs}");
        let warning = logs.lines().find(|line| line.contains("TransportFailure")).unwrap();
        assert!(warning.contains("WARN"), "{warning}");
        assert!(warning.contains("#6"), "{warning}");
    }

    #[test]
    fn missing_conditions_key_logs_no_warning() {
        let body = r#"{"search_api": {"result": [{"areaName": [{"value": "Nowhere"}]}]}}"#;
        let (pipeline, _source) = build(&Config::default(), body.to_string());

        let (completion, logs) =
            capture_logs(|| pipeline.run(FetchId(7), "10001", ForecastMode::SingleDay));

        assert_eq!(completion, Completion::empty(FetchId(7), ForecastMode::SingleDay));
        assert!(logs.contains("document carries no current conditions"), "{logs}");
        assert!(!logs.contains("WARN"), "{logs}");
        assert!(!logs.contains("ERROR"), "{logs}");
    }

    #[derive(Debug)]
    struct PanickingIcons;

    impl IconLoader for PanickingIcons {
        fn load(&self, _url: &str, _sample_size: Option<u32>) -> Option<Icon> {
            panic!("icon decoder blew up");
        }
    }

    #[test]
    fn panicking_icon_loader_keeps_fields_read_so_far() {
        let body = r#"{"data": {"current_condition": [{
            "temp_F": "72",
            "humidity": "40",
            "weatherIconUrl": [{"value": "http://cdn.example/sunny.png"}],
            "precipMM": "0.0"
        }]}}"#;
        let pipeline = ForecastPipeline::new(
            &Config::default(),
            Arc::new(StaticSource::new(body)),
            Arc::new(PanickingIcons),
        );

        let (completion, logs) =
            capture_logs(|| pipeline.run(FetchId(8), "10001", ForecastMode::SingleDay));

        let Completion::SingleDay { forecast, .. } = completion else {
            panic!("expected single-day completion");
        };
        assert_eq!(forecast.temperature.as_deref(), Some("72"));
        assert_eq!(forecast.humidity.as_deref(), Some("40"));
        assert!(forecast.icon.is_none());
        assert_eq!(forecast.precipitation_amount, None);
        assert!(logs.contains("icon decoder blew up"), "{logs}");
    }
}
