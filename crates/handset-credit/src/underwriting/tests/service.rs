use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::underwriting::domain::{ApplicantUpdate, Device, DeviceId, LoanRequest, RiskGroupId};
use crate::underwriting::repository::{
    ApplicantRepository, DeviceRepository, LoanRepository, RepositoryError,
};
use crate::underwriting::{
    CheckoutStatus, EntityKind, InMemoryStore, IntakeOutcome, UnderwritingError,
    UnderwritingService,
};

#[test]
fn registration_assigns_risk_group_by_age() {
    let (service, store) = build_service();

    let young = register(&service, TWENTY_NINE_YEAR_OLD, date(1995, 3, 1), Some(4000));
    let middle = register(&service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(7000));
    let senior = register(&service, SIXTY_THREE_YEAR_OLD, date(1960, 7, 15), None);

    assert_eq!(young.risk_group_id, Some(risk_group(&store, 1).id));
    assert_eq!(middle.risk_group_id, Some(risk_group(&store, 2).id));
    assert_eq!(senior.risk_group_id, Some(risk_group(&store, 3).id));
    assert_eq!(middle.monthly_income, Some(dec!(7000)));
    assert_eq!(senior.monthly_income, None);
    assert_eq!(store.count_applicants().expect("count"), 3);
}

#[test]
fn registration_reports_every_failure_at_once() {
    let (service, store) = build_service();
    let mut payload = registration("123", date(1990, 1, 1), Some(0));
    payload.first_name = "A".to_string();

    let outcome = service
        .register_applicant(payload, today())
        .expect("registration runs");

    assert_eq!(
        outcome.errors(),
        [
            "First name must be at least 2 characters",
            "ID number must be exactly 13 digits",
            "Monthly income must be greater than 0",
            "Monthly income seems too low. Please verify.",
        ]
    );
    assert_eq!(store.count_applicants().expect("count"), 0);
}

#[test]
fn registration_rejects_checksum_mismatch() {
    let (service, _) = build_service();

    let outcome = service
        .register_applicant(registration("9001015800085", date(1990, 1, 1), None), today())
        .expect("registration runs");

    assert_eq!(
        outcome,
        IntakeOutcome::Rejected(vec!["Invalid check digit (expected 8, got 5)".to_string()])
    );
}

#[test]
fn registration_rejects_age_outside_window_and_birthday_mismatch() {
    let (service, _) = build_service();

    let outcome = service
        .register_applicant(registration(SIXTY_SIX_YEAR_OLD, date(1958, 6, 2), None), today())
        .expect("registration runs");

    assert_eq!(
        outcome.errors(),
        [
            "Age must be between 18 and 65 (inclusive)",
            "Birthday does not match ID number",
        ]
    );
}

#[test]
fn plausibility_floor_flags_low_income() {
    let (service, _) = build_service();

    let outcome = service
        .register_applicant(
            registration(THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(500)),
            today(),
        )
        .expect("registration runs");

    assert_eq!(
        outcome.errors(),
        ["Monthly income seems too low. Please verify."]
    );
}

#[test]
fn repeated_registration_updates_the_same_applicant() {
    let (service, store) = build_service();

    let first = register(&service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(5000));
    let mut again = registration(
        &format!(" {THIRTY_FOUR_YEAR_OLD} "),
        date(1990, 1, 1),
        Some(6500),
    );
    again.first_name = "Lerato".to_string();
    let second = service
        .register_applicant(again, today())
        .expect("registration runs")
        .accepted()
        .expect("registration accepted");

    assert_eq!(first.id, second.id);
    assert_eq!(second.first_name, "Lerato");
    assert_eq!(second.monthly_income, Some(dec!(6500)));
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(store.count_applicants().expect("count"), 1);
}

#[test]
fn whitespace_inside_identity_number_is_dropped() {
    let (service, store) = build_service();

    let spaced = register(&service, "900101 5800 088", date(1990, 1, 1), Some(5000));
    assert_eq!(spaced.identity_number, THIRTY_FOUR_YEAR_OLD);

    let compact = register(&service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(5000));
    assert_eq!(compact.id, spaced.id);
    assert_eq!(store.count_applicants().expect("count"), 1);
}

#[test]
fn concurrent_registrations_converge_on_one_applicant() {
    let (service, store) = build_service();

    let service = &service;
    let ids: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    register(service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(7000)).id
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    assert_eq!(store.count_applicants().expect("count"), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[test]
fn registration_without_configured_group_is_a_configuration_error() {
    let service = UnderwritingService::new(Arc::new(InMemoryStore::new()));

    let result = service.register_applicant(
        registration(THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), None),
        today(),
    );

    assert_eq!(result, Err(UnderwritingError::Configuration { ordinal: 2 }));
}

#[test]
fn repository_failures_propagate() {
    let service = UnderwritingService::new(Arc::new(UnavailableStore));

    match service.register_applicant(
        registration(THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), None),
        today(),
    ) {
        Err(UnderwritingError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected repository error, got {other:?}"),
    }
    assert!(matches!(
        service.list_affordable_devices(None, None),
        Err(UnderwritingError::Repository(_))
    ));
}

#[test]
fn update_selects_device_and_validates_references() {
    let (service, store) = build_service();
    let applicant = register(&service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(7000));
    let pixel = device_named(&store, "Google Pixel 8");

    let updated = service
        .update_applicant(
            applicant.id,
            ApplicantUpdate {
                selected_device_id: Some(pixel.id),
                ..ApplicantUpdate::default()
            },
        )
        .expect("update runs")
        .accepted()
        .expect("update accepted");
    assert_eq!(updated.selected_device_id, Some(pixel.id));
    assert_eq!(updated.monthly_income, Some(dec!(7000)));

    let rejected = service
        .update_applicant(
            applicant.id,
            ApplicantUpdate {
                last_name: Some("Z".to_string()),
                selected_device_id: Some(DeviceId::new()),
                ..ApplicantUpdate::default()
            },
        )
        .expect("update runs");
    assert_eq!(
        rejected.errors(),
        ["Last name must be at least 2 characters", "Device not found"]
    );

    let stored = service.get_applicant(applicant.id).expect("applicant stored");
    assert_eq!(stored.last_name, "Mokoena");
}

#[test]
fn update_of_unknown_applicant_is_not_found() {
    let (service, _) = build_service();

    match service.update_applicant(Default::default(), ApplicantUpdate::default()) {
        Err(UnderwritingError::NotFound {
            entity: EntityKind::Applicant,
            ..
        }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn prices_device_for_risk_group() {
    let (service, store) = build_service();
    let iphone = device_named(&store, "iPhone 15 Pro");
    let group = risk_group(&store, 1);

    let pricing = service
        .price_device(iphone.id, group.id)
        .expect("pricing succeeds");

    assert_eq!(pricing.deposit_amount, dec!(375.00));
    assert_eq!(pricing.loan_principal, dec!(2125.00));
    assert_eq!(pricing.loan_amount, dec!(2507.50));
    assert_eq!(pricing.daily_payment, dec!(6.97));
    assert_eq!(pricing.monthly_payment, dec!(209.10));

    let missing = service.price_device(DeviceId::new(), group.id);
    assert_eq!(
        missing.map_err(|err| err.to_string()),
        Err("Device not found".to_string())
    );
}

#[test]
fn lists_devices_by_price_and_filters_by_affordability() {
    let (service, store) = build_service();
    let group = risk_group(&store, 1);

    let all = service
        .list_affordable_devices(None, None)
        .expect("listing succeeds");
    let prices: Vec<Decimal> = all.iter().map(|device| device.cash_price).collect();
    assert_eq!(
        prices,
        [dec!(1200), dec!(1500), dec!(1800), dec!(2200), dec!(2500)]
    );

    let income_only = service
        .list_affordable_devices(Some(dec!(100)), None)
        .expect("listing succeeds");
    assert_eq!(income_only.len(), 5);

    let within_2000 = service
        .list_affordable_devices(Some(dec!(2000)), Some(group.id))
        .expect("listing succeeds");
    assert!(within_2000.iter().all(|device| device.name != "iPhone 15 Pro"));
    assert_eq!(within_2000.len(), 4);

    let within_1800 = service
        .list_affordable_devices(Some(dec!(1800)), Some(group.id))
        .expect("listing succeeds");
    assert_eq!(within_1800.len(), 3);
}

#[test]
fn affordability_filter_with_unknown_risk_group_is_not_found() {
    let (service, _) = build_service();

    let result = service.list_affordable_devices(Some(dec!(1800)), Some(RiskGroupId::new()));

    assert!(matches!(
        result,
        Err(UnderwritingError::NotFound {
            entity: EntityKind::RiskGroup,
            ..
        })
    ));
}

#[test]
fn unpriceable_device_surfaces_pricing_error() {
    let (service, store) = build_service();
    let group = risk_group(&store, 1);
    let applicant = register(&service, TWENTY_NINE_YEAR_OLD, date(1995, 3, 1), Some(7000));
    let device = store
        .insert_device(Device {
            id: DeviceId::new(),
            name: "Gilded".to_string(),
            brand: "Vault".to_string(),
            cash_price: Decimal::MAX,
            image_url: None,
        })
        .expect("insert succeeds");

    assert!(matches!(
        service.price_device(device.id, group.id),
        Err(UnderwritingError::Pricing(_))
    ));
    assert!(matches!(
        service.list_affordable_devices(Some(dec!(7000)), Some(group.id)),
        Err(UnderwritingError::Pricing(_))
    ));
    assert!(matches!(
        service.create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: device.id,
            risk_group_id: group.id,
            initial_status: None,
        }),
        Err(UnderwritingError::Pricing(_))
    ));
    assert_eq!(store.count_loans().expect("count"), 0);
}

#[test]
fn creates_loan_and_links_applicant() {
    let (service, store) = build_service();
    let applicant = register(&service, TWENTY_NINE_YEAR_OLD, date(1995, 3, 1), Some(7000));
    let iphone = device_named(&store, "iPhone 15 Pro");
    let group = risk_group(&store, 1);

    let details = service
        .create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: iphone.id,
            risk_group_id: group.id,
            initial_status: None,
        })
        .expect("loan request runs")
        .accepted()
        .expect("loan accepted");

    assert_eq!(details.loan.status, CheckoutStatus::Pending);
    assert_eq!(details.loan.deposit_amount, dec!(375.00));
    assert_eq!(details.loan.daily_payment, dec!(6.97));
    assert_eq!(details.applicant.loan_id, Some(details.loan.id));
    assert_eq!(details.device.id, iphone.id);
    assert_eq!(details.risk_group.id, group.id);

    let held = service
        .loans_for_applicant(applicant.id)
        .expect("loan lookup succeeds");
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].loan.id, details.loan.id);
}

#[test]
fn loan_with_missing_references_reports_each_and_writes_nothing() {
    let (service, store) = build_service();
    let applicant = register(&service, TWENTY_NINE_YEAR_OLD, date(1995, 3, 1), Some(7000));

    let outcome = service
        .create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: DeviceId::new(),
            risk_group_id: RiskGroupId::new(),
            initial_status: None,
        })
        .expect("loan request runs");

    assert_eq!(outcome.errors(), ["Device not found", "Risk group not found"]);
    assert_eq!(store.count_loans().expect("count"), 0);
    let stored = service.get_applicant(applicant.id).expect("applicant stored");
    assert_eq!(stored.loan_id, None);
}

#[test]
fn unaffordable_loan_is_rejected() {
    let (service, store) = build_service();
    let applicant = register(&service, TWENTY_NINE_YEAR_OLD, date(1995, 3, 1), Some(2000));

    let outcome = service
        .create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: device_named(&store, "iPhone 15 Pro").id,
            risk_group_id: risk_group(&store, 1).id,
            initial_status: None,
        })
        .expect("loan request runs");

    assert_eq!(
        outcome.errors(),
        ["Monthly income must be at least 10x the monthly payment amount"]
    );
    assert_eq!(store.count_loans().expect("count"), 0);
}

#[test]
fn undeclared_income_skips_affordability_gate() {
    let (service, store) = build_service();
    let applicant = register(&service, SIXTY_THREE_YEAR_OLD, date(1960, 7, 15), None);

    let outcome = service
        .create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: device_named(&store, "iPhone 15 Pro").id,
            risk_group_id: risk_group(&store, 3).id,
            initial_status: Some(CheckoutStatus::Review),
        })
        .expect("loan request runs");

    let details = outcome.accepted().expect("loan accepted");
    assert_eq!(details.loan.status, CheckoutStatus::Review);
}

#[test]
fn applicant_may_hold_only_one_loan() {
    let (service, store) = build_service();
    let applicant = register(&service, TWENTY_NINE_YEAR_OLD, date(1995, 3, 1), Some(9000));
    let request = LoanRequest {
        applicant_id: applicant.id,
        device_id: device_named(&store, "Xiaomi 14").id,
        risk_group_id: risk_group(&store, 1).id,
        initial_status: None,
    };

    assert!(service
        .create_loan(request.clone())
        .expect("loan request runs")
        .is_accepted());
    let second = service.create_loan(request).expect("loan request runs");

    assert_eq!(second.errors(), ["Applicant already has a loan"]);
    assert_eq!(store.count_loans().expect("count"), 1);
}

#[test]
fn checkout_advances_through_review_to_completion() {
    let (service, store) = build_service();
    let applicant = register(&service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(7000));
    let loan = service
        .create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: device_named(&store, "OnePlus 12").id,
            risk_group_id: risk_group(&store, 2).id,
            initial_status: None,
        })
        .expect("loan request runs")
        .accepted()
        .expect("loan accepted")
        .loan;

    let reviewed = service
        .advance_checkout(loan.id, CheckoutStatus::Review)
        .expect("advance succeeds");
    assert_eq!(reviewed.loan.status, CheckoutStatus::Review);

    let completed = service
        .advance_checkout(loan.id, CheckoutStatus::Completed)
        .expect("advance succeeds");
    assert_eq!(completed.loan.status, CheckoutStatus::Completed);
    assert_eq!(completed.applicant.id, applicant.id);

    let stored = service.get_loan(loan.id).expect("loan stored");
    assert_eq!(stored.loan.status, CheckoutStatus::Completed);
}

#[test]
fn checkout_accepts_moves_off_the_standard_path() {
    let (service, store) = build_service();
    let applicant = register(&service, THIRTY_FOUR_YEAR_OLD, date(1990, 1, 1), Some(7000));
    let loan = service
        .create_loan(LoanRequest {
            applicant_id: applicant.id,
            device_id: device_named(&store, "OnePlus 12").id,
            risk_group_id: risk_group(&store, 2).id,
            initial_status: Some(CheckoutStatus::Completed),
        })
        .expect("loan request runs")
        .accepted()
        .expect("loan accepted")
        .loan;

    let reopened = service
        .advance_checkout(loan.id, CheckoutStatus::Pending)
        .expect("transitions are currently unconstrained");
    assert_eq!(reopened.loan.status, CheckoutStatus::Pending);
}

#[test]
fn checkout_of_unknown_loan_is_not_found() {
    let (service, _) = build_service();

    let err = service
        .advance_checkout(Default::default(), CheckoutStatus::Review)
        .expect_err("missing loan");
    assert_eq!(err.to_string(), "Loan not found");
}
