use provision_gateway::{synthetic_address, Account, GatewayClient, GatewayError, MockGateway, Network, ScriptedOutcome,
                        ScriptedResult, TransactionStatus};
use provision_manifest::{AccessRule, Decimal, EntityKind, FungibleResourceDefinition, FungibleResourceRoles, Instruction,
                         ManifestBuilder, ManifestValue, MetadataConfig, MetadataEntry, MetadataValue, OwnerRole, RoleAssignment,
                         ValueKind};

fn account() -> Account {
    Account::from_hex(&"2a".repeat(32), synthetic_address(EntityKind::Account, Network::Stokenet, 42)).expect("test account")
}

fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal")
}

#[tokio::test]
async fn ledger_echoes_typed_operands_including_nested_enum_indices() {
    let gateway = MockGateway::stokenet();
    let account = account();
    let owner = synthetic_address(EntityKind::Resource, Network::Stokenet, 7);
    let owner_role = OwnerRole::Updatable(AccessRule::require_amount(dec("4"), owner.clone()));
    let manifest =
        ManifestBuilder::new().lock_fee(account.address(), dec("100"))
                              .create_proof_of_amount(account.address(), &owner, dec("4"))
                              .create_fungible_resource(FungibleResourceDefinition { owner_role: owner_role.clone(),
                                                                                     track_total_supply: true,
                                                                                     divisibility: 18,
                                                                                     initial_supply: Some(dec("1")),
                                                                                     roles: FungibleResourceRoles { burn: Some(RoleAssignment::locked(AccessRule::AllowAll)),
                                                                                                                    ..Default::default() },
                                                                                     metadata: MetadataConfig::new().with("symbol", MetadataEntry::locked(MetadataValue::String("sUSD".into()))) })
                              .call_method(&synthetic_address(EntityKind::Component, Network::Stokenet, 8),
                                           "set_price_quote_in_xrd",
                                           vec![ManifestValue::Address(owner.clone()), ManifestValue::Decimal(dec("145.25050961"))])
                              .call_method(&synthetic_address(EntityKind::Component, Network::Stokenet, 9),
                                           "fill_validator_staking",
                                           vec![ManifestValue::array(ValueKind::Tuple,
                                                                     vec![ManifestValue::Tuple(vec![ManifestValue::Decimal(dec("1.5")),
                                                                                                    ManifestValue::Decimal(dec("2")),
                                                                                                    ManifestValue::U64(86688)])])])
                              .deposit_all(account.address())
                              .build();

    let tx = gateway.build_transaction(&manifest, &account).await.unwrap();
    gateway.submit_transaction(&tx).await.unwrap();

    let seen = gateway.submissions();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].manifest, manifest);
    assert_eq!(seen[0].intent, tx.intent);
    assert_eq!(seen[0].header.network_id, Network::Stokenet.id());
    match &seen[0].manifest.instructions[2] {
        Instruction::CreateFungibleResource(def) => assert_eq!(def.owner_role, owner_role),
        other => panic!("unexpected instruction {other:?}"),
    }
}

#[tokio::test]
async fn success_exposes_new_addresses_in_script_order() {
    let gateway = MockGateway::stokenet();
    let account = account();
    let scripted = vec![synthetic_address(EntityKind::Component, Network::Stokenet, 100),
                        synthetic_address(EntityKind::Resource, Network::Stokenet, 101),
                        synthetic_address(EntityKind::Resource, Network::Stokenet, 102)];
    gateway.script(ScriptedOutcome { result: ScriptedResult::Success(Some(scripted.clone())),
                                     pending_polls: 2 });
    let tx = gateway.build_transaction(&ManifestBuilder::new().lock_fee(account.address(), dec("10")).build(), &account)
                    .await
                    .unwrap();
    gateway.submit_transaction(&tx).await.unwrap();

    assert_eq!(gateway.get_transaction_status(&tx.intent).await.unwrap(), TransactionStatus::Pending);
    assert!(matches!(gateway.get_new_addresses(&tx.intent).await, Err(GatewayError::NotCommitted(_))));
    assert_eq!(gateway.get_transaction_status(&tx.intent).await.unwrap(), TransactionStatus::Pending);
    assert_eq!(gateway.get_transaction_status(&tx.intent).await.unwrap(), TransactionStatus::Success);
    assert_eq!(gateway.get_new_addresses(&tx.intent).await.unwrap(), scripted);
    assert_eq!(gateway.status_calls(), 3);
}

#[tokio::test]
async fn failure_and_submit_error_are_reported() {
    let gateway = MockGateway::stokenet();
    let account = account();
    gateway.script_failure("insufficient balance");
    gateway.script(ScriptedOutcome { result: ScriptedResult::SubmitError("connection reset".into()),
                                     pending_polls: 0 });

    let first = gateway.build_transaction(&ManifestBuilder::new().lock_fee(account.address(), dec("10")).build(), &account)
                       .await
                       .unwrap();
    gateway.submit_transaction(&first).await.unwrap();
    assert_eq!(gateway.get_transaction_status(&first.intent).await.unwrap(),
               TransactionStatus::Failed { reason: "insufficient balance".into() });

    let second = gateway.build_transaction(&ManifestBuilder::new().lock_fee(account.address(), dec("11")).build(), &account)
                        .await
                        .unwrap();
    assert!(matches!(gateway.submit_transaction(&second).await, Err(GatewayError::Http(_))));
    assert_eq!(gateway.submission_count(), 1);
}

#[tokio::test]
async fn state_version_grows_with_submissions() {
    let gateway = MockGateway::stokenet();
    let account = account();
    let before = gateway.get_state_version().await.unwrap();
    let tx = gateway.build_transaction(&ManifestBuilder::new().deposit_all(account.address()).build(), &account)
                    .await
                    .unwrap();
    gateway.submit_transaction(&tx).await.unwrap();
    assert!(gateway.get_state_version().await.unwrap() > before);
}
