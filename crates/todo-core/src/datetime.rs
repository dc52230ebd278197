use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(anyhow!(
      "timezone cannot be empty"
    ));
  }

  trimmed.parse::<Tz>().map_err(|err| {
    anyhow!(
      "invalid timezone '{trimmed}': \
       {err}"
    )
  })
}

#[must_use]
pub fn to_local_date(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  dt.with_timezone(&tz).date_naive()
}

#[must_use]
pub fn format_date(
  dt: DateTime<Utc>,
  tz: Tz
) -> String {
  dt.with_timezone(&tz)
    .format("%Y-%m-%d")
    .to_string()
}

/// Parses the due date typed into a
/// task form. `none` and `clear` mean
/// "no due date".
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_due_input(
  input: &str,
  now: DateTime<Utc>,
  tz: Tz
) -> anyhow::Result<Option<DateTime<Utc>>>
{
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "" | "none" | "clear" => {
      return Ok(None);
    }
    | "today" => {
      let today = to_local_date(now, tz);
      return local_midnight(
        today, tz, "today"
      )
      .map(Some);
    }
    | "tomorrow" => {
      let tomorrow = to_local_date(
        now, tz
      )
      .checked_add_signed(
        Duration::days(1)
      )
      .ok_or_else(|| {
        anyhow!(
          "failed to advance to \
           tomorrow"
        )
      })?;
      return local_midnight(
        tomorrow, tz, "tomorrow"
      )
      .map(Some);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    let date = next_weekday_date(
      to_local_date(now, tz),
      target
    );
    return local_midnight(
      date,
      tz,
      "weekday-name"
    )
    .map(Some);
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let duration = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => Duration::try_days(num),
      | Some("w") => {
        Duration::try_weeks(num)
      }
      | other => {
        return Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ));
      }
    };
    let negative = caps
      .name("sign")
      .map(|m| m.as_str() == "-")
      .unwrap_or(false);

    let shifted =
      duration.and_then(|duration| {
        if negative {
          now.checked_sub_signed(
            duration
          )
        } else {
          now.checked_add_signed(
            duration
          )
        }
      });
    return shifted.map(Some).ok_or_else(
      || {
        anyhow!(
          "due date offset out of \
           range: {token}"
        )
      }
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(
      date,
      tz,
      "iso-date"
    )
    .map(Some);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(Some(
      dt.with_timezone(&Utc)
    ));
  }

  Err(anyhow!(
    "unrecognized due date '{token}': \
     use YYYY-MM-DD, today, tomorrow, \
     a weekday, +Nd, +Nw, or none"
  ))
}

fn local_midnight(
  date: NaiveDate,
  tz: Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  let naive = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {context}"
      )
    })?;
  to_utc_from_local(naive, tz, context)
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(first
        .min(second)
        .with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in timezone {tz}: \
         {context}"
      ))
    }
  }
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" => {
      Some(Weekday::Thu)
    }
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Always strictly after `from`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = i64::from(
    from
      .weekday()
      .num_days_from_monday()
  );
  let target_idx = i64::from(
    target.num_days_from_monday()
  );
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };
  use chrono_tz::Tz;

  use super::{
    format_date,
    parse_due_input,
    parse_timezone
  };

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now")
  }

  #[test]
  fn none_and_clear_mean_no_due_date() {
    for input in ["none", "CLEAR", "  "] {
      assert_eq!(
        parse_due_input(
          input,
          now(),
          Tz::UTC
        )
        .expect("parse"),
        None
      );
    }
  }

  #[test]
  fn parses_iso_date_at_local_midnight()
  {
    let tz = parse_timezone(
      "America/Mexico_City"
    )
    .expect("timezone");
    let due = parse_due_input(
      "2026-03-05",
      now(),
      tz
    )
    .expect("parse")
    .expect("some due date");
    assert_eq!(
      due,
      Utc
        .with_ymd_and_hms(
          2026, 3, 5, 6, 0, 0
        )
        .single()
        .expect("valid utc")
    );
    assert_eq!(
      format_date(due, tz),
      "2026-03-05"
    );
  }

  #[test]
  fn parses_relative_offsets() {
    let due = parse_due_input(
      "+2w",
      now(),
      Tz::UTC
    )
    .expect("parse")
    .expect("some due date");
    assert_eq!(
      due,
      now() + Duration::weeks(2)
    );

    let past = parse_due_input(
      "-3d",
      now(),
      Tz::UTC
    )
    .expect("parse")
    .expect("some due date");
    assert_eq!(
      past,
      now() - Duration::days(3)
    );
  }

  #[test]
  fn parses_tomorrow_and_weekday() {
    let tomorrow = parse_due_input(
      "tomorrow",
      now(),
      Tz::UTC
    )
    .expect("parse")
    .expect("some due date");
    assert_eq!(
      format_date(tomorrow, Tz::UTC),
      "2026-02-18"
    );

    // 2026-02-17 is a Tuesday.
    let tuesday = parse_due_input(
      "tue",
      now(),
      Tz::UTC
    )
    .expect("parse")
    .expect("some due date");
    assert_eq!(
      format_date(tuesday, Tz::UTC),
      "2026-02-24"
    );
  }

  #[test]
  fn rejects_garbage() {
    assert!(
      parse_due_input(
        "next sprint",
        now(),
        Tz::UTC
      )
      .is_err()
    );
    assert!(
      parse_timezone("Mars/Olympus")
        .is_err()
    );
  }

  #[test]
  fn huge_relative_offsets_are_errors()
  {
    for input in [
      "+999999999d",
      "-999999999w",
      "+99999999999999999d"
    ] {
      let err = parse_due_input(
        input,
        now(),
        Tz::UTC
      )
      .expect_err("offset overflows");
      assert!(
        err
          .to_string()
          .contains("out of range"),
        "{input}: {err}"
      );
    }

    assert!(
      parse_due_input(
        "+99999999999999999999d",
        now(),
        Tz::UTC
      )
      .is_err()
    );
  }
}
