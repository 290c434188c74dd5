use company_directory::db::Database;
use company_directory::error::Error;
use company_directory::models::*;
use serde_json::json;
use speculate2::speculate;

fn row(name: &str) -> CompanyRow {
    CompanyRow {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[test]
fn reopens_data_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directory.db");

    {
        let db = Database::open(path.clone()).unwrap();
        db.migrate().unwrap();
        db.create_list("Persistent").unwrap();
    }

    let db = Database::open(path).unwrap();
    db.migrate().unwrap();
    assert_eq!(db.lists().unwrap()[0].title, "Persistent");
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "records" {
        describe "create_record" {
            it "stores title, body and published status" {
                let record = db.create_record(RecordKind::Company, "Acme", "<p>hi</p>")
                    .expect("Failed to create record");

                let found = db.get_record(record.id).expect("Query failed").unwrap();
                assert_eq!(found.kind, RecordKind::Company);
                assert_eq!(found.title, "Acme");
                assert_eq!(found.body, "<p>hi</p>");
                assert_eq!(found.status, STATUS_PUBLISHED);
            }

            it "assigns increasing positive ids from one shared id space" {
                let company = db.create_record(RecordKind::Company, "Acme", "").unwrap();
                let list = db.create_record(RecordKind::List, "Featured", "").unwrap();

                assert!(company.id > 0);
                assert!(list.id > company.id);
            }
        }

        describe "get_record" {
            it "returns None for an unknown id" {
                assert!(db.get_record(999).expect("Query failed").is_none());
            }
        }

        describe "metadata" {
            it "round-trips scalar and array values" {
                let record = db.create_record(RecordKind::Company, "Acme", "").unwrap();

                db.meta_set(record.id, "rating", &json!(7)).unwrap();
                db.meta_set(record.id, "benefits", &json!(["a", "b"])).unwrap();

                assert_eq!(db.meta_get(record.id, "rating").unwrap(), Some(json!(7)));
                assert_eq!(db.meta_get(record.id, "benefits").unwrap(), Some(json!(["a", "b"])));
            }

            it "overwrites on repeated set" {
                let record = db.create_record(RecordKind::Company, "Acme", "").unwrap();

                db.meta_set(record.id, "rating", &json!(3)).unwrap();
                db.meta_set(record.id, "rating", &json!(9)).unwrap();

                assert_eq!(db.meta_get(record.id, "rating").unwrap(), Some(json!(9)));
            }

            it "reads absent after delete" {
                let record = db.create_record(RecordKind::Company, "Acme", "").unwrap();

                db.meta_set(record.id, "rating", &json!(3)).unwrap();
                db.meta_delete(record.id, "rating").unwrap();

                assert!(db.meta_get(record.id, "rating").unwrap().is_none());
            }

            it "is dropped when the record is deleted" {
                let record = db.create_record(RecordKind::Company, "Acme", "").unwrap();
                db.meta_set(record.id, "rating", &json!(3)).unwrap();

                assert!(db.delete_record(record.id).unwrap());
                assert!(db.meta_get(record.id, "rating").unwrap().is_none());
            }
        }
    }

    describe "companies" {
        describe "upsert_company_from_row" {
            it "creates a published company from a full row" {
                let id = db.upsert_company_from_row(&CompanyRow {
                    name: Some("Acme".to_string()),
                    rating: Some(json!(8)),
                    benefits: Some(json!(["Fast", "Cheap"])),
                    cons: Some(json!(["Loud"])),
                    has_free_trial: Some(json!(true)),
                    summary: Some("<p>Solid</p>".to_string()),
                }).unwrap().expect("Row should import");

                let company = db.get_company(id).unwrap().unwrap();
                assert_eq!(company.name, "Acme");
                assert_eq!(company.rating, 8);
                assert_eq!(company.benefits, vec!["Fast", "Cheap"]);
                assert_eq!(company.cons, vec!["Loud"]);
                assert!(company.has_free_trial);
                assert_eq!(company.summary, "<p>Solid</p>");
            }

            it "returns None and writes nothing for an empty name" {
                assert!(db.upsert_company_from_row(&row("   ")).unwrap().is_none());
                assert!(db.upsert_company_from_row(&CompanyRow::default()).unwrap().is_none());
                assert!(db.company_summaries().unwrap().is_empty());
            }

            it "matches an existing company regardless of letter case and fully replaces its fields" {
                let first = db.upsert_company_from_row(&CompanyRow {
                    name: Some("Acme".to_string()),
                    rating: Some(json!(8)),
                    benefits: Some(json!(["Fast"])),
                    has_free_trial: Some(json!(true)),
                    ..Default::default()
                }).unwrap().unwrap();

                let second = db.upsert_company_from_row(&CompanyRow {
                    name: Some("acme".to_string()),
                    summary: Some("x".to_string()),
                    ..Default::default()
                }).unwrap().unwrap();

                assert_eq!(first, second);
                assert_eq!(db.company_summaries().unwrap().len(), 1);

                // The second row carried no rating/benefits/trial, so the
                // stored values reflect its defaults, not the first row's.
                let company = db.get_company(first).unwrap().unwrap();
                assert_eq!(company.name, "Acme");
                assert_eq!(company.summary, "x");
                assert_eq!(company.rating, 0);
                assert!(company.benefits.is_empty());
                assert!(!company.has_free_trial);
            }

            it "does not clamp the rating on this path" {
                let id = db.upsert_company_from_row(&CompanyRow {
                    name: Some("Overrated".to_string()),
                    rating: Some(json!(25)),
                    ..Default::default()
                }).unwrap().unwrap();

                assert_eq!(db.get_company(id).unwrap().unwrap().rating, 25);
            }

            it "coerces loosely-typed rating and trial values" {
                let id = db.upsert_company_from_row(&CompanyRow {
                    name: Some("Loose".to_string()),
                    rating: Some(json!("6")),
                    has_free_trial: Some(json!(1)),
                    ..Default::default()
                }).unwrap().unwrap();

                let company = db.get_company(id).unwrap().unwrap();
                assert_eq!(company.rating, 6);
                assert!(company.has_free_trial);
            }

            it "drops empty benefit entries and stores an all-empty sequence as absent" {
                let id = db.upsert_company_from_row(&CompanyRow {
                    name: Some("Sparse".to_string()),
                    benefits: Some(json!(["", "Real", "  "])),
                    cons: Some(json!(["", ""])),
                    ..Default::default()
                }).unwrap().unwrap();

                let company = db.get_company(id).unwrap().unwrap();
                assert_eq!(company.benefits, vec!["Real"]);
                assert!(company.cons.is_empty());
                assert!(db.meta_get(id, CONS_KEY).unwrap().is_none());
            }

            it "sanitizes the name and filters the summary markup" {
                let id = db.upsert_company_from_row(&CompanyRow {
                    name: Some("  Acme <b>Corp</b>  ".to_string()),
                    summary: Some("<p>ok</p><script>alert(1)</script>".to_string()),
                    ..Default::default()
                }).unwrap().unwrap();

                let company = db.get_company(id).unwrap().unwrap();
                assert_eq!(company.name, "Acme Corp");
                assert!(company.summary.contains("<p>ok</p>"));
                assert!(!company.summary.contains("script"));
            }
        }

        describe "find_company_by_exact_name" {
            it "ignores letter case but never returns a near-match" {
                db.upsert_company_from_row(&row("Acme")).unwrap();
                db.upsert_company_from_row(&row("Acme Corp")).unwrap();

                let hit = db.find_company_by_exact_name("acme").unwrap().unwrap();
                assert_eq!(hit.name, "Acme");

                assert!(db.find_company_by_exact_name("Acme Cor").unwrap().is_none());
                assert!(db.find_company_by_exact_name("").unwrap().is_none());
            }
        }

        describe "get_company" {
            it "refuses a list id" {
                let list = db.create_list("Featured").unwrap();
                assert!(db.get_company(list.id).unwrap().is_none());
            }
        }

        describe "company_summaries" {
            it "sorts alphabetically by name" {
                db.upsert_company_from_row(&row("zeta")).unwrap();
                db.upsert_company_from_row(&row("Alpha")).unwrap();
                db.upsert_company_from_row(&row("beta")).unwrap();

                let names: Vec<String> = db.company_summaries().unwrap()
                    .into_iter().map(|c| c.name).collect();
                assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
            }
        }
    }

    describe "lists" {
        describe "create_list" {
            it "creates a list with the title and empty membership" {
                let list = db.create_list("Featured").unwrap();

                let found = db.get_list(list.id).unwrap().unwrap();
                assert_eq!(found.title, "Featured");
                assert!(db.ordered_members(list.id).unwrap().is_empty());
            }
        }

        describe "get_list" {
            it "refuses a company id" {
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();
                assert!(db.get_list(id).unwrap().is_none());
            }
        }

        describe "replace_members" {
            it "keeps the positive-integer subsequence in submitted order" {
                let list = db.create_list("Featured").unwrap();

                let raw = vec![json!(3), json!("7"), json!(0), json!(-2), json!("x"), json!(5)];
                let count = db.replace_members(list.id, &raw).unwrap();

                assert_eq!(count, 3);
                assert_eq!(db.ordered_members(list.id).unwrap(), vec![3, 7, 5]);
            }

            it "preserves duplicate ids" {
                let list = db.create_list("Featured").unwrap();

                db.replace_members(list.id, &[json!(2), json!(2), json!(3)]).unwrap();
                assert_eq!(db.ordered_members(list.id).unwrap(), vec![2, 2, 3]);
            }

            it "clears storage entirely for an empty submission" {
                let list = db.create_list("Featured").unwrap();

                db.replace_members(list.id, &[json!(4)]).unwrap();
                let count = db.replace_members(list.id, &[]).unwrap();

                assert_eq!(count, 0);
                assert!(db.ordered_members(list.id).unwrap().is_empty());
                // Indistinguishable from a list that never had members set.
                assert!(db.meta_get(list.id, MEMBER_IDS_KEY).unwrap().is_none());
            }

            it "treats an all-junk submission as empty" {
                let list = db.create_list("Featured").unwrap();

                db.replace_members(list.id, &[json!(4)]).unwrap();
                let count = db.replace_members(list.id, &[json!(0), json!("x")]).unwrap();

                assert_eq!(count, 0);
                assert!(db.meta_get(list.id, MEMBER_IDS_KEY).unwrap().is_none());
            }
        }

        describe "membership" {
            it "allows one company to appear in several lists" {
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();
                let first = db.create_list("First").unwrap();
                let second = db.create_list("Second").unwrap();

                db.replace_members(first.id, &[json!(id)]).unwrap();
                db.replace_members(second.id, &[json!(id)]).unwrap();

                assert_eq!(db.ordered_members(first.id).unwrap(), vec![id]);
                assert_eq!(db.ordered_members(second.id).unwrap(), vec![id]);
            }
        }

        describe "ordered_members" {
            it "reads absent membership as empty" {
                let list = db.create_list("Featured").unwrap();
                assert!(db.ordered_members(list.id).unwrap().is_empty());
            }

            it "reads non-array metadata as empty" {
                let list = db.create_list("Featured").unwrap();
                db.meta_set(list.id, MEMBER_IDS_KEY, &json!("oops")).unwrap();

                assert!(db.ordered_members(list.id).unwrap().is_empty());
            }
        }
    }

    describe "actors" {
        describe "create_actor" {
            it "is found again by its token" {
                let (actor, token) = db.create_actor("ops", true, false).unwrap();

                let found = db.find_actor_by_token(&token).unwrap().unwrap();
                assert_eq!(found.id, actor.id);
                assert_eq!(found.name, "ops");
                assert!(found.is_manager);
                assert!(!found.edit_all);
            }

            it "is not found by an unknown token" {
                db.create_actor("ops", true, false).unwrap();
                assert!(db.find_actor_by_token("nope").unwrap().is_none());
            }
        }

        describe "can_edit" {
            it "requires a grant unless the actor has edit_all" {
                let (plain, _) = db.create_actor("plain", true, false).unwrap();
                let (super_editor, _) = db.create_actor("super", true, true).unwrap();
                let list = db.create_list("Featured").unwrap();

                assert!(!db.can_edit(&plain, list.id).unwrap());
                assert!(db.can_edit(&super_editor, list.id).unwrap());

                db.grant_edit(plain.id, list.id).unwrap();
                assert!(db.can_edit(&plain, list.id).unwrap());
            }
        }
    }

    describe "curation" {
        describe "available_and_selected" {
            it "partitions the full company set" {
                let a = db.upsert_company_from_row(&row("Alpha")).unwrap().unwrap();
                let b = db.upsert_company_from_row(&row("Beta")).unwrap().unwrap();
                let c = db.upsert_company_from_row(&row("Gamma")).unwrap().unwrap();
                let list = db.create_list("Featured").unwrap();
                db.replace_members(list.id, &[json!(c), json!(a)]).unwrap();

                let curation = company_directory::curation::available_and_selected(&db, list.id).unwrap();
                assert_eq!(curation.selected, vec![c, a]);
                assert_eq!(curation.available, vec![b]);

                // Disjoint, and together they cover every company.
                assert!(curation.available.iter().all(|id| !curation.selected.contains(id)));
                let mut union: Vec<i64> = curation.available.iter()
                    .chain(curation.selected.iter()).copied().collect();
                union.sort_unstable();
                assert_eq!(union, vec![a, b, c]);
            }

            it "lists every company alphabetically when nothing is selected" {
                let a = db.upsert_company_from_row(&row("Alpha")).unwrap().unwrap();
                let z = db.upsert_company_from_row(&row("zeta")).unwrap().unwrap();
                let list = db.create_list("Featured").unwrap();

                let curation = company_directory::curation::available_and_selected(&db, list.id).unwrap();
                assert_eq!(curation.available, vec![a, z]);
                assert!(curation.selected.is_empty());
            }

            it "rejects an id that is not a list" {
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();
                assert!(matches!(
                    company_directory::curation::available_and_selected(&db, id),
                    Err(Error::NotFound(_))
                ));
            }
        }

        describe "bootstrap_default_list" {
            it "creates the default list only when none exist" {
                let created = company_directory::curation::bootstrap_default_list(&db).unwrap();
                assert_eq!(created.unwrap().title, DEFAULT_LIST_TITLE);

                // Second run is a no-op.
                assert!(company_directory::curation::bootstrap_default_list(&db).unwrap().is_none());
                assert_eq!(db.lists().unwrap().len(), 1);
            }

            it "does nothing when a list already exists" {
                db.create_list("Handmade").unwrap();
                assert!(company_directory::curation::bootstrap_default_list(&db).unwrap().is_none());
            }
        }

        describe "rename_list" {
            it "renames with a sanitized title" {
                let actor = Actor::local_admin();
                let list = db.create_list("Old").unwrap();

                let renamed = company_directory::curation::rename_list(&db, &actor, list.id, &RenameListInput {
                    title: "  New <b>Name</b> ".to_string(),
                }).unwrap();

                assert_eq!(renamed.title, "New Name");
                assert_eq!(db.get_list(list.id).unwrap().unwrap().title, "New Name");
            }

            it "rejects an empty title" {
                let actor = Actor::local_admin();
                let list = db.create_list("Old").unwrap();

                let err = company_directory::curation::rename_list(&db, &actor, list.id, &RenameListInput {
                    title: "   ".to_string(),
                }).unwrap_err();

                assert!(matches!(err, Error::Validation(_)));
                assert_eq!(db.get_list(list.id).unwrap().unwrap().title, "Old");
            }

            it "rejects an id that is not a list" {
                let actor = Actor::local_admin();
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();

                let err = company_directory::curation::rename_list(&db, &actor, id, &RenameListInput {
                    title: "New".to_string(),
                }).unwrap_err();

                assert!(matches!(err, Error::NotFound(_)));
            }

            it "leaves the list untouched for an actor without edit permission" {
                let (actor, _) = db.create_actor("ops", true, false).unwrap();
                let list = db.create_list("Old").unwrap();

                let err = company_directory::curation::rename_list(&db, &actor, list.id, &RenameListInput {
                    title: "New".to_string(),
                }).unwrap_err();

                assert!(matches!(err, Error::Forbidden));
                assert_eq!(db.get_list(list.id).unwrap().unwrap().title, "Old");
            }

            it "rejects an actor without the manage capability" {
                let (actor, _) = db.create_actor("viewer", false, true).unwrap();
                let list = db.create_list("Old").unwrap();

                let err = company_directory::curation::rename_list(&db, &actor, list.id, &RenameListInput {
                    title: "New".to_string(),
                }).unwrap_err();

                assert!(matches!(err, Error::Forbidden));
            }
        }

        describe "save_order" {
            it "stores the normalized order and reports the count" {
                let actor = Actor::local_admin();
                let list = db.create_list("Featured").unwrap();

                let count = company_directory::curation::save_order(&db, &actor, list.id, &ReplaceMembersInput {
                    ids: vec![json!(9), json!(0), json!(4)],
                }).unwrap();

                assert_eq!(count, 2);
                assert_eq!(db.ordered_members(list.id).unwrap(), vec![9, 4]);
            }

            it "leaves membership unchanged for an actor without edit permission" {
                let admin = Actor::local_admin();
                let (actor, _) = db.create_actor("ops", true, false).unwrap();
                let list = db.create_list("Featured").unwrap();
                company_directory::curation::save_order(&db, &admin, list.id, &ReplaceMembersInput {
                    ids: vec![json!(1)],
                }).unwrap();

                let err = company_directory::curation::save_order(&db, &actor, list.id, &ReplaceMembersInput {
                    ids: vec![json!(2)],
                }).unwrap_err();

                assert!(matches!(err, Error::Forbidden));
                assert_eq!(db.ordered_members(list.id).unwrap(), vec![1]);
            }
        }

        describe "create_list" {
            it "grants the creating actor edit permission on the new list" {
                let (actor, _) = db.create_actor("ops", true, false).unwrap();

                let list = company_directory::curation::create_list(&db, &actor, &CreateListInput {
                    title: "Mine".to_string(),
                }).unwrap();

                assert!(db.can_edit(&actor, list.id).unwrap());
            }

            it "rejects an empty title" {
                let actor = Actor::local_admin();
                let err = company_directory::curation::create_list(&db, &actor, &CreateListInput {
                    title: "<b></b>".to_string(),
                }).unwrap_err();

                assert!(matches!(err, Error::Validation(_)));
                assert!(db.lists().unwrap().is_empty());
            }
        }

        describe "update_company" {
            it "clamps the rating on the admin edit path" {
                let actor = Actor::local_admin();
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();

                let updated = company_directory::curation::update_company(&db, &actor, id, &UpdateCompanyInput {
                    rating: Some(25),
                    ..Default::default()
                }).unwrap();

                assert_eq!(updated.rating, 10);
            }

            it "caps benefits at the first three submitted entries" {
                let actor = Actor::local_admin();
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();

                let updated = company_directory::curation::update_company(&db, &actor, id, &UpdateCompanyInput {
                    benefits: Some(vec![
                        "one".to_string(),
                        "two".to_string(),
                        "three".to_string(),
                        "four".to_string(),
                    ]),
                    ..Default::default()
                }).unwrap();

                assert_eq!(updated.benefits, vec!["one", "two", "three"]);
            }

            it "stores an emptied cons sequence as absent" {
                let actor = Actor::local_admin();
                let id = db.upsert_company_from_row(&CompanyRow {
                    name: Some("Acme".to_string()),
                    cons: Some(json!(["Slow"])),
                    ..Default::default()
                }).unwrap().unwrap();

                let updated = company_directory::curation::update_company(&db, &actor, id, &UpdateCompanyInput {
                    cons: Some(vec![String::new()]),
                    ..Default::default()
                }).unwrap();

                assert!(updated.cons.is_empty());
                assert!(db.meta_get(id, CONS_KEY).unwrap().is_none());
            }

            it "requires edit permission but not the manage capability" {
                let (actor, _) = db.create_actor("editor", false, false).unwrap();
                let id = db.upsert_company_from_row(&row("Acme")).unwrap().unwrap();

                let err = company_directory::curation::update_company(&db, &actor, id, &UpdateCompanyInput {
                    rating: Some(5),
                    ..Default::default()
                }).unwrap_err();
                assert!(matches!(err, Error::Forbidden));

                db.grant_edit(actor.id, id).unwrap();
                let updated = company_directory::curation::update_company(&db, &actor, id, &UpdateCompanyInput {
                    rating: Some(5),
                    ..Default::default()
                }).unwrap();
                assert_eq!(updated.rating, 5);
            }
        }
    }
}
