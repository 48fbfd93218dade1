use rand::seq::IndexedRandom;

/// Spoken duration, e.g. "12 minutos e 30 segundos".
pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        return format!("{} segundos", seconds);
    }

    let minutes = seconds / 60;
    let remaining = seconds % 60;

    if remaining == 0 {
        if minutes == 1 {
            "1 minuto".to_string()
        } else {
            format!("{} minutos", minutes)
        }
    } else {
        let min_text = if minutes == 1 { "minuto" } else { "minutos" };
        let sec_text = if remaining == 1 { "segundo" } else { "segundos" };
        format!("{} {} e {} {}", minutes, min_text, remaining, sec_text)
    }
}

/// Spoken pace, e.g. "5 minutos e 30 segundos por quilômetro".
pub fn format_pace(min_per_km: f64) -> String {
    let total_seconds = (min_per_km * 60.0) as i64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if seconds == 0 {
        format!("{} minutos por quilômetro", minutes)
    } else {
        let min_text = if minutes == 1 { "minuto" } else { "minutos" };
        let sec_text = if seconds == 1 { "segundo" } else { "segundos" };
        format!("{} {} e {} {} por quilômetro", minutes, min_text, seconds, sec_text)
    }
}

/// Voice message for a milestone crossing.
pub fn coaching_message(meters: u32, elapsed_seconds: i64, pace: Option<f64>) -> String {
    let time_text = format_duration(elapsed_seconds);

    match pace {
        Some(pace) => format!(
            "Você completou {} metros em {}. Seu pace atual é {}.",
            meters, time_text, format_pace(pace)
        ),
        None => format!(
            "Você completou {} metros em {}. Continue assim!",
            meters, time_text
        ),
    }
}

const MOTIVATION_PHRASES: [&str; 5] = [
    "Excelente desempenho hoje! Continue assim.",
    "Você está evoluindo rápido — orgulhe-se desse treino!",
    "Mais um passo na jornada. Mantenha a constância!",
    "Ótimo trabalho! A cada treino, mais forte.",
    "Treino concluído com sucesso! Descanse bem para o próximo desafio.",
];

/// Voice message for the end of a workout, closed with a random
/// motivational phrase.
pub fn completion_message(meters: u32, elapsed_seconds: i64, pace: Option<f64>) -> String {
    let distance_km = meters as f64 / 1000.0;
    let distance_text = if distance_km < 1.0 {
        format!("{} metros", meters)
    } else {
        format!("{:.2} quilômetros", distance_km)
    };

    let time_text = format_duration(elapsed_seconds);

    let mut message = match pace {
        Some(pace) => format!(
            "Parabéns! Você completou seu treino em {}, percorrendo uma distância de {} em um pace de {}. ",
            time_text, distance_text, format_pace(pace)
        ),
        None => format!(
            "Parabéns! Você completou seu treino em {}, percorrendo uma distância de {}. ",
            time_text, distance_text
        ),
    };

    let mut rng = rand::rng();
    message.push_str(MOTIVATION_PHRASES.choose(&mut rng).unwrap());

    message
}

#[test]
fn duration_forms() {
    assert_eq!(format_duration(45), "45 segundos");
    assert_eq!(format_duration(60), "1 minuto");
    assert_eq!(format_duration(120), "2 minutos");
    assert_eq!(format_duration(61), "1 minuto e 1 segundo");
    assert_eq!(format_duration(150), "2 minutos e 30 segundos");
}

#[test]
fn pace_forms() {
    assert_eq!(format_pace(5.0), "5 minutos por quilômetro");
    assert_eq!(format_pace(5.5), "5 minutos e 30 segundos por quilômetro");
}

#[test]
fn coaching_message_with_and_without_pace() {
    let with_pace = coaching_message(500, 150, Some(5.0));
    assert_eq!(
        with_pace,
        "Você completou 500 metros em 2 minutos e 30 segundos. Seu pace atual é 5 minutos por quilômetro."
    );

    let without_pace = coaching_message(500, 150, None);
    assert!(without_pace.ends_with("Continue assim!"));
}

#[test]
fn completion_message_switches_units_at_one_km() {
    let short = completion_message(800, 300, None);
    assert!(short.contains("800 metros"));

    let long = completion_message(2500, 900, Some(6.0));
    assert!(long.contains("2.50 quilômetros"));
    assert!(long.contains("6 minutos por quilômetro"));
    assert!(MOTIVATION_PHRASES.iter().any(|phrase| long.ends_with(phrase)));
}
