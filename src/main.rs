#[macro_use]
extern crate clap;

use std::error::Error;
use std::sync::Arc;

use clap::{App, Arg, ArgMatches};
use clap::arg_enum;
use log::{debug, error, info, warn};

use radiobox::libs::config_dir::config_dir;
use radiobox::libs::config_file::config_file::ConfigurationStore;
use radiobox::libs::parameters::parameters::parse_value;
use radiobox::libs::patterns::observer::{SyncEvent, SyncObserver};
use radiobox::libs::session::session::RadioBoxSession;
use radiobox::libs::transport::transport::HttpTransport;
use radiobox::libs::util::logging::initialise_logging;
use radiobox::libs::util::version::VERSION;

const SERVER_URL: &'static str = "server-url";
const REQUEST_TIMEOUT_MS: &'static str = "request-timeout-ms";
const ASSIGNMENTS: &'static str = "assignments";

arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Mode {
        ConfigFileLocation,
        Show,
        Set,
        Run,
        Stop
    }
}

fn parse_command_line<'a>() -> (ArgMatches<'a>, Mode) {
    let result = App::new("radiobox")
        .version(VERSION)
        .author("Matt Gumbley <matt.gumbley@gmail.com>")
        .about("Command line client for the RadioBox Red Pitaya app")

        .arg(Arg::from_usage("<mode> 'The mode to use, usually Show.'").possible_values(&Mode::variants()).default_value("Show"))

        .arg(Arg::with_name(ASSIGNMENTS)
            .help("Parameters to set in Set mode, e.g. osc1_qrg_i=7074000 rb_run=true")
            .value_name("key=value")
            .multiple(true))

        .arg(Arg::with_name(SERVER_URL)
            .short("s").long("server").help("Sets the base URL of the Red Pitaya web-server, e.g. http://192.168.1.100")
            .value_name("URL").takes_value(true))

        .arg(Arg::with_name(REQUEST_TIMEOUT_MS)
            .short("t").long("timeout").help("Sets how long to wait for the web-server, in milliseconds")
            .value_name("timeout in ms").takes_value(true))

        .get_matches();

    let mode = value_t!(result.value_of("mode"), Mode).unwrap_or(Mode::Show);

    return (result, mode);
}

// Stands in for the modal error dialog: reports failures with the recovery choices.
struct LoggingObserver;

impl SyncObserver for LoggingObserver {
    fn on_sync_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::ParameterUpdated { key, value } => debug!("Device reports {} = {}", key, value),
            SyncEvent::SignalsReceived(_) => debug!("Signals received"),
            SyncEvent::SyncFailed(failure) => {
                let recovery = failure.recovery;
                warn!("{} (retry: {}, restart: {}, ignore: {})", failure.error, recovery.retry, recovery.restart, recovery.ignore);
            }
        }
    }
}

fn run(arguments: ArgMatches, mode: Mode) -> Result<i32, Box<dyn Error>> {
    let home_dir = dirs::home_dir();
    let config_path = config_dir::configuration_directory(home_dir)?;
    let config_path_clone = config_path.clone();
    let mut config = ConfigurationStore::new(config_path)?;
    if mode == Mode::ConfigFileLocation {
        info!("Configuration path is [{:?}]", config_path_clone);
        info!("Configuration file is [{:?}]", config.get_config_file_path());
        return Ok(0)
    }

    configure_server(&arguments, &mut config)?;

    let transport = HttpTransport::new(config.to_transport_config())?;
    let mut session = RadioBoxSession::new(config.to_sync_config(), Box::new(transport));
    session.register_observer(Arc::new(LoggingObserver));
    session.start()?;

    match mode {
        Mode::Show => {
            show_parameters(&session);
        }
        Mode::Set => {
            let assignments: Vec<&str> = arguments.values_of(ASSIGNMENTS).map(|v| v.collect()).unwrap_or_default();
            if assignments.is_empty() {
                return Err("Nothing to set: give key=value assignments after Set".into());
            }
            for assignment in assignments {
                let (key, value) = assignment.split_once('=')
                    .ok_or_else(|| format!("'{}' is not a key=value assignment", assignment))?;
                session.set(key.trim(), parse_value(value.trim()))?;
            }
            session.send()?;
            show_parameters(&session);
        }
        Mode::Run => {
            session.run_flag(true)?;
        }
        Mode::Stop => {
            session.run_flag(false)?;
            session.stop();
            return Ok(0)
        }
        Mode::ConfigFileLocation => {}
    }
    session.leave_running();
    Ok(0)
}

fn configure_server(arguments: &ArgMatches, config: &mut ConfigurationStore) -> Result<(), Box<dyn Error>> {
    if let Some(url) = arguments.value_of(SERVER_URL) {
        config.set_base_url(url.to_string())?;
    }
    if let Some(timeout_str) = arguments.value_of(REQUEST_TIMEOUT_MS) {
        match timeout_str.parse::<u64>() {
            Ok(timeout_ms) => config.set_request_timeout_ms(timeout_ms)?,
            Err(_) => {
                return Err(format!("Setting {}: '{}' is not a whole number of milliseconds", REQUEST_TIMEOUT_MS, timeout_str).into());
            }
        }
    }
    Ok(())
}

fn show_parameters(session: &RadioBoxSession) {
    let orig = session.sync().orig();
    info!("Device has {} parameters", orig.len());
    for (key, value) in orig {
        info!("{} = {}", key, value);
    }
}

fn main() {
    initialise_logging();

    let (arguments, mode) = parse_command_line();
    debug!("Command line parsed");

    match run(arguments, mode) {
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
    }
}
