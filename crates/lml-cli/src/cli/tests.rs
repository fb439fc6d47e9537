use super::*;

#[test]
fn no_arguments_means_configured_defaults() {
    let cli = Cli::try_parse_from(["lml-retrieve"]).unwrap();
    assert!(cli.timeframe.is_none());
    assert!(cli.retry_timeframe.is_none());
}

#[test]
fn two_integers_override_both_lookbacks() {
    let cli = Cli::try_parse_from(["lml-retrieve", "3", "24"]).unwrap();
    assert_eq!(cli.timeframe, Some(3));
    assert_eq!(cli.retry_timeframe, Some(24));
}

#[test]
fn zero_retry_timeframe_is_accepted() {
    let cli = Cli::try_parse_from(["lml-retrieve", "3", "0"]).unwrap();
    assert_eq!(cli.retry_timeframe, Some(0));
}

#[test]
fn single_integer_is_rejected() {
    // The lookbacks must be overridden together.
    assert!(Cli::try_parse_from(["lml-retrieve", "3"]).is_err());
}

#[test]
fn non_integer_argument_is_rejected() {
    assert!(Cli::try_parse_from(["lml-retrieve", "three", "24"]).is_err());
}

#[test]
fn long_help_explains_the_retry_opt_out() {
    let help = Cli::command().render_long_help().to_string();
    assert!(help.contains("0 disables retries"));
    assert!(help.contains("RETRY_TIMEFRAME"));
}
