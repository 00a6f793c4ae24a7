use chrono::NaiveDate;
use pathvoice::kernel::intent::{parse, parse_date, EventQuery, Intent, IntentKind};

#[test]
fn test_command_vocabulary() {
    assert_eq!(parse("dialog schließen"), Intent::CloseDialog);
    assert_eq!(parse("Neuer Termin"), Intent::CreateAppointment);
    assert_eq!(parse("ich möchte einen neuer termin anlegen"), Intent::CreateAppointment);
    assert_eq!(parse("auf ein wiederhören"), Intent::EndSession);
    assert_eq!(parse("Auf ein baldiges Wiederhören"), Intent::EndSession);
    assert_eq!(parse("hilfe"), Intent::Help);
    assert_eq!(parse("ich brauche Hilfe"), Intent::Help);
    assert_eq!(parse("start"), Intent::ControlStart);
    assert_eq!(parse("Weiter"), Intent::ControlNext);
    assert_eq!(parse("zurück"), Intent::ControlPrevious);
    assert_eq!(parse("neue eingabe"), Intent::ControlRepeat);
    assert_eq!(parse(" fertig "), Intent::ControlFinish);
    assert_eq!(parse("wie wird das wetter"), Intent::Unrecognized);
    assert_eq!(parse(""), Intent::Unrecognized);
}

#[test]
fn test_close_dialog_is_exact_phrase() {
    // Only the whole utterance closes a dialog.
    assert_eq!(parse("bitte dialog schließen jetzt"), Intent::Unrecognized);
}

#[test]
fn test_control_words_are_exact() {
    assert_eq!(parse("weiter bitte"), Intent::Unrecognized);
    assert_eq!(parse("ich bin fertig"), Intent::Unrecognized);
}

#[test]
fn test_symptom_keeps_original_casing() {
    assert_eq!(
        parse("Neues Symptom Kopfschmerzen seit Montag"),
        Intent::AddSymptom {
            symptom: "Kopfschmerzen seit Montag".to_string()
        }
    );
}

#[test]
fn test_symptom_without_text_is_empty() {
    assert_eq!(
        parse("neues symptom"),
        Intent::AddSymptom {
            symptom: String::new()
        },
        "Empty symptom must be reported, not rejected by the parser"
    );
}

#[test]
fn test_show_event_extraction() {
    let intent = parse("Zeige Zahnarzt am 01.05.2024");
    assert_eq!(
        intent,
        Intent::ShowEvent(EventQuery {
            name: "zahnarzt".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            raw_date: "01.05.2024".to_string(),
        })
    );
}

#[test]
fn test_delete_event_uses_last_am() {
    let Intent::DeleteEvent(query) = parse("lösche termin am hafen am 2024-03-12") else {
        panic!("Expected DeleteEvent");
    };
    assert_eq!(query.name, "termin am hafen");
    assert_eq!(query.date, NaiveDate::from_ymd_opt(2024, 3, 12));
    assert!(query.is_complete());
}

#[test]
fn test_unparsable_date_is_flagged_not_fatal() {
    let Intent::DeleteEvent(query) = parse("lösche zahnarzt am morgen früh") else {
        panic!("Expected DeleteEvent");
    };
    assert_eq!(query.name, "zahnarzt");
    assert_eq!(query.date, None);
    assert_eq!(query.raw_date, "morgen früh");
    assert!(!query.is_complete(), "Unparsable date must not count as a complete query");
}

#[test]
fn test_rule_order_first_match_wins() {
    // "hilfe" outranks show/delete.
    assert_eq!(parse("zeige hilfe am 01.05.2024"), Intent::Help);
    // Symptom outranks help.
    assert_eq!(
        parse("neues symptom hilfe"),
        Intent::AddSymptom {
            symptom: "hilfe".to_string()
        }
    );
}

#[test]
fn test_parse_is_idempotent() {
    let samples = [
        "neuer termin",
        "neues symptom Husten",
        "zeige zahnarzt am 1.5.2024",
        "lösche x am 31.02.2024",
        "blabla",
    ];
    for sample in samples {
        assert_eq!(parse(sample), parse(sample), "parse must be pure for '{}'", sample);
    }
}

#[test]
fn test_intent_kinds() {
    assert_eq!(parse("hilfe").kind(), IntentKind::Help);
    assert_eq!(parse("weiter").kind(), IntentKind::ControlNext);
    assert_eq!(parse("neuer termin").kind(), IntentKind::CreateAppointment);
}

#[test]
fn test_date_parsing() {
    assert_eq!(parse_date("2024-05-01"), NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(parse_date("1.5.2024"), NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(parse_date("31.02.2024"), None, "Invalid calendar dates are rejected");
    assert_eq!(parse_date("morgen früh"), None);
}
