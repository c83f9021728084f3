mod common;

use actix_web::{http::StatusCode, test, web, App};
use barbershop::{config::SeedConfig, db, routes};
use serde_json::{json, Value};

use common::OPEN_DAY;

#[actix_web::test]
async fn admin_routes_require_an_admin_token() {
    let state = common::state().await;
    let (_, customer) = common::customer(&state, "ola@shop.test").await;
    let (_, admin) = common::admin(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/admin/dashboard").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/admin/dashboard")
        .insert_header(common::bearer(&customer))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/admin/dashboard")
        .insert_header(common::bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["stats"].as_array().unwrap().len(), 5);
}

#[actix_web::test]
async fn schedule_upsert_feeds_availability() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::put()
        .uri("/admin/schedules/1")
        .insert_header(common::bearer(&admin))
        .set_json(json!({ "startTime": "10:00", "endTime": "12:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri("/admin/schedules/1")
        .insert_header(common::bearer(&admin))
        .set_json(json!({ "startTime": "9:00", "endTime": "10:30" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["dayOfWeek"], 1);
    assert_eq!(body["startTime"], "09:00");
    assert_eq!(body["isActive"], true);

    let req = test::TestRequest::get().uri("/schedules").to_request();
    let schedules: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(schedules.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/appointments/available-slots/{OPEN_DAY}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["availableSlots"], json!(["09:00", "09:30", "10:00"]));

    let req = test::TestRequest::delete()
        .uri("/admin/schedules/1")
        .insert_header(common::bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/appointments/available-slots/{OPEN_DAY}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["availableSlots"], json!([]));
}

#[actix_web::test]
async fn schedule_input_is_validated() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let cases = [
        ("/admin/schedules/7", json!({ "startTime": "09:00", "endTime": "18:00" })),
        ("/admin/schedules/2", json!({ "startTime": "18:00", "endTime": "09:00" })),
        ("/admin/schedules/2", json!({ "startTime": "9am", "endTime": "18:00" })),
        ("/admin/schedules/2", json!({ "startTime": "+9:00", "endTime": "18:00" })),
        ("/admin/schedules/300", json!({ "startTime": "09:00", "endTime": "18:00" })),
        ("/admin/schedules/mon", json!({ "startTime": "09:00", "endTime": "18:00" })),
    ];
    for (uri, payload) in cases {
        let req = test::TestRequest::put()
            .uri(uri)
            .insert_header(common::bearer(&admin))
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }

    let req = test::TestRequest::delete()
        .uri("/admin/schedules/mon")
        .insert_header(common::bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unavailability_lifecycle() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    common::hours(&state.db, 1, "09:00", "11:00").await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/unavailabilities")
        .insert_header(common::bearer(&admin))
        .set_json(json!({
            "date": OPEN_DAY,
            "startTime": "09:00",
            "endTime": "10:00",
            "reason": "Training"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/unavailabilities?date={OPEN_DAY}"))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["reason"], "Training");

    let slots_uri = format!("/appointments/available-slots/{OPEN_DAY}");
    let req = test::TestRequest::get().uri(&slots_uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["availableSlots"], json!(["10:00", "10:30"]));

    let req = test::TestRequest::put()
        .uri(&format!("/admin/unavailabilities/{id}"))
        .insert_header(common::bearer(&admin))
        .set_json(json!({
            "date": OPEN_DAY,
            "startTime": "09:00",
            "endTime": "10:00",
            "reason": "Training",
            "isActive": false
        }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["isActive"], false);

    let req = test::TestRequest::get().uri(&slots_uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["availableSlots"].as_array().unwrap().len(), 4);

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/unavailabilities/{id}"))
        .insert_header(common::bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/unavailabilities/{id}"))
        .insert_header(common::bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deleting_a_service_hides_it() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/services")
        .insert_header(common::bearer(&admin))
        .set_json(json!({
            "name": "Beard trim",
            "duration": 20,
            "price": 15.0,
            "category": "beard"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["isActive"], true);

    let req = test::TestRequest::get().uri("/services").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/services/{id}"))
        .insert_header(common::bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/services").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(listed.as_array().unwrap().is_empty());

    let req = test::TestRequest::get().uri(&format!("/services/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/admin/services")
        .insert_header(common::bearer(&admin))
        .to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all[0]["isActive"], false);
}

#[actix_web::test]
async fn service_payload_is_validated() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/services")
        .insert_header(common::bearer(&admin))
        .set_json(json!({ "name": " ", "duration": 0, "price": -1.0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("name"));
    assert!(message.contains("Duration"));
    assert!(message.contains("Price"));
}

#[actix_web::test]
async fn status_changes_follow_the_lifecycle() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let (customer, _) = common::customer(&state, "pat@shop.test").await;
    let cut = common::service(&state.db, "Cut", 30, 20.0).await;
    let id = common::appointment(&state.db, &customer.id, &cut, OPEN_DAY, "10:00", "10:30", "pending").await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;
    let mut events = state.events.subscribe();

    let set = |status: &str| {
        test::TestRequest::patch()
            .uri(&format!("/admin/appointments/{id}/status"))
            .insert_header(common::bearer(&admin))
            .set_json(json!({ "status": status }))
            .to_request()
    };

    let body: Value = test::call_and_read_body_json(&app, set("confirmed")).await;
    assert_eq!(body["status"], "confirmed");
    let event = events.try_recv().unwrap();
    assert_eq!(event.kind, "appointment_updated");
    assert_eq!(event.status, "confirmed");

    let resp = test::call_service(&app, set("pending")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, set("teleported")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::call_and_read_body_json(&app, set("completed")).await;
    assert_eq!(body["status"], "completed");

    let resp = test::call_service(&app, set("cancelled")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/admin/appointments?status=completed")
        .insert_header(common::bearer(&admin))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["userName"], "pat");

    let req = test::TestRequest::get()
        .uri("/admin/appointments?status=pending")
        .insert_header(common::bearer(&admin))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn register_login_and_me() {
    let state = common::state().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": "Quin@Shop.test", "password": "secret1", "name": "Quin" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let session: Value = test::read_body_json(resp).await;
    assert_eq!(session["user"]["email"], "quin@shop.test");
    assert_eq!(session["user"]["role"], "customer");

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": "quin@shop.test", "password": "secret1", "name": "Again" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "quin@shop.test", "password": "wrong!" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "quin@shop.test", "password": "secret1" }))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    let token = session["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(common::bearer(&token))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["name"], "Quin");
}

#[actix_web::test]
async fn deactivated_user_loses_access() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let (customer, token) = common::customer(&state, "rae@shop.test").await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::patch()
        .uri(&format!("/admin/users/{}", customer.id))
        .insert_header(common::bearer(&admin))
        .set_json(json!({ "active": false }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["active"], false);

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(common::bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn gallery_add_list_remove() {
    let state = common::state().await;
    let (_, admin) = common::admin(&state).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/gallery")
        .insert_header(common::bearer(&admin))
        .set_json(json!({ "title": "Skin fade", "imageUrl": "/uploads/fade.jpg", "category": "fades" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let photo: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::get().uri("/gallery?category=fades").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/gallery?category=beards").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(listed.as_array().unwrap().is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("/admin/gallery/{}", photo["id"].as_str().unwrap()))
        .insert_header(common::bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/gallery").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn seeding_is_idempotent() {
    let pool = common::pool().await;
    let seed = SeedConfig {
        admin_email: "owner@shop.test".to_string(),
        admin_password: "owner-pass".to_string(),
        admin_name: "Owner".to_string(),
        schedule: true,
    };

    db::seed_defaults(&pool, &seed).await.unwrap();
    db::seed_defaults(&pool, &seed).await.unwrap();

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(admins, 1);

    let days: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(days, 6);
}
