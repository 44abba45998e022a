pub(crate) mod mock;

use harvester_model::managers::Restore;
use harvester_model::spec::{
    BackupTarget, BackupTargetSpec, RunMode, RunStrategy, SpecModel, VmSpec,
};
use harvester_model::{
    Body, HttpStatusCode, Manager, ManagerRegistry, Payload, RawDocument, RequestArgs,
    RequestDelegate, UpdatePolicy,
};
use harvester_model::managers::HostManager;
use http::Method;
use mock::{path_of, MockTransport};
use serde_json::{json, Value};

fn vm_document() -> Value {
    json!({
        "apiVersion": "kubevirt.io/v1",
        "kind": "VirtualMachine",
        "metadata": {
            "name": "vm-1",
            "namespace": "default",
            "resourceVersion": "4242",
            "labels": {"team": "storage"},
        },
        "spec": {
            "running": true,
            "template": {"spec": {
                "domain": {"devices": {"disks": [{"name": "rootdisk", "disk": {"bus": "virtio"}}]}},
                "volumes": [
                    {"name": "rootdisk", "persistentVolumeClaim": {"claimName": "vm-1-rootdisk"}},
                    {"name": "cloudinitdisk", "cloudInitNoCloud": {"userData": "#cloud-config\n"}},
                ],
            }},
        },
        "status": {"printableStatus": "Running"},
    })
}

fn sent_json(body: &Body) -> &Value {
    match body {
        Body::Json(value) => value,
        other => panic!("expected a JSON body, got {:?}", other),
    }
}

#[test]
fn disallowed_operations_send_nothing() {
    let transport = MockTransport::new();
    let client = transport.client("v1.2.0");
    let document = RawDocument(json!({}));

    assert!(client.hosts().create("node-0", &document).unwrap_err().is_disallowed());
    assert!(client
        .keypairs()
        .update("key", "default", &document)
        .unwrap_err()
        .is_disallowed());
    assert!(client.settings().create("x", &document).unwrap_err().is_disallowed());
    assert!(client.settings().delete("x").unwrap_err().is_disallowed());
    assert!(client
        .backups()
        .create("b", "default", &document)
        .unwrap_err()
        .is_disallowed());
    assert!(client
        .backups()
        .update("b", "default", &document)
        .unwrap_err()
        .is_disallowed());
    assert!(transport.requests().is_empty());
}

#[test]
fn stale_manager_reports_client_gone() {
    let transport = MockTransport::new();
    let client = transport.client("v1.2.0");
    let vms = client.virtual_machines().clone();
    drop(client);

    let error = vms.get("vm-1", "default").unwrap_err();
    assert!(error.is_client_gone());
    assert!(vms.start("vm-1", "default").unwrap_err().is_client_gone());
    assert!(transport.requests().is_empty());
}

#[test]
fn get_returns_status_and_payload() {
    let transport = MockTransport::new();
    transport.respond_json(404, json!({"message": "not found"}));
    let client = transport.client("v1.2.0");

    let response = client.volumes().get("missing", "default").unwrap();
    assert!(response.is_not_found());
    assert_eq!(response.json().unwrap()["message"], "not found");

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(
        path_of(&requests[0]),
        "v1/harvester/persistentvolumeclaims/default/missing"
    );
}

#[test]
fn undecodable_body_is_not_an_error() {
    let transport = MockTransport::new();
    transport.respond(502, Some("application/json"), "<html>bad gateway</html>");
    let client = transport.client("v1.2.0");

    let response = client.images().list(None).unwrap();
    assert_eq!(response.status.as_u16(), 502);
    match &response.payload {
        Payload::Undecodable { response, .. } => {
            assert_eq!(response.text(), "<html>bad gateway</html>")
        }
        other => panic!("expected an undecodable payload, got {:?}", other),
    }
}

#[test]
fn download_is_raw() {
    let transport = MockTransport::new();
    transport.respond(200, Some("application/octet-stream"), vec![0u8, 159, 146, 150]);
    let client = transport.client("v1.2.0");

    let response = client.images().download("ubuntu", "default").unwrap();
    assert_eq!(response.bytes().as_ref(), &[0u8, 159, 146, 150]);
    assert_eq!(
        path_of(&transport.requests()[0]),
        "v1/harvester/harvesterhci.io.virtualmachineimages/default/ubuntu/download"
    );
}

#[test]
fn update_merges_onto_current_document() {
    let transport = MockTransport::new();
    transport
        .respond_json(200, vm_document())
        .respond_json(200, json!({}));
    let client = transport.client("v1.2.0");

    let change = RawDocument(json!({"metadata": {"labels": {"env": "prod"}}}));
    let response = client
        .virtual_machines()
        .update_document("vm-1", "default", &change, UpdatePolicy::Optimistic)
        .unwrap();
    assert!(response.is_success());

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, Method::PUT);
    let sent = sent_json(&requests[1].body);
    assert_eq!(sent["metadata"]["labels"], json!({"team": "storage", "env": "prod"}));
    assert_eq!(sent["metadata"]["resourceVersion"], "4242");
    assert_eq!(sent["status"], json!({"printableStatus": "Running"}));
}

#[test]
fn conflict_is_returned_to_the_caller() {
    let transport = MockTransport::new();
    transport
        .respond_json(200, vm_document())
        .respond_json(409, json!({"reason": "Conflict"}));
    let client = transport.client("v1.2.0");

    let change = RawDocument(json!({"metadata": {"labels": {"env": "prod"}}}));
    let response = client
        .virtual_machines()
        .update_document("vm-1", "default", &change, UpdatePolicy::default())
        .unwrap();
    assert!(response.is_conflict());
    assert_eq!(transport.requests().len(), 2);
}

#[test]
fn overwrite_drops_resource_version() {
    let transport = MockTransport::new();
    transport
        .respond_json(200, vm_document())
        .respond_json(200, json!({}));
    let client = transport.client("v1.2.0");

    let vms = client.virtual_machines();
    let mut spec = VmSpec::from_document(vm_document()).unwrap();
    spec.cpu_cores = 8;
    vms.update("vm-1", "default", &spec, UpdatePolicy::Overwrite)
        .unwrap();

    let sent = sent_json(&transport.requests()[1].body).clone();
    assert!(sent["metadata"].get("resourceVersion").is_none());
    assert_eq!(sent["metadata"]["labels"]["team"], "storage");
    assert_eq!(sent["spec"]["template"]["spec"]["domain"]["cpu"]["cores"], 8);
}

#[test]
fn failed_fetch_skips_the_write() {
    let transport = MockTransport::new();
    transport.respond_json(404, json!({"message": "not found"}));
    let client = transport.client("v1.2.0");

    let response = client
        .hosts()
        .update("node-9", &RawDocument(json!({})), UpdatePolicy::default())
        .unwrap();
    assert!(response.is_not_found());
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn variant_follows_cluster_version() {
    let old = MockTransport::new().client("v1.0.3");
    assert!(!old.virtual_machines().uses_run_strategy());
    assert!(old.variants().contains(&("virtual machine", "base")));

    let new = MockTransport::new().client("v1.1.0");
    assert!(new.virtual_machines().uses_run_strategy());
    assert!(new.variants().contains(&("virtual machine", "run-strategy")));

    let dev = MockTransport::new().client("master-head");
    assert!(dev.virtual_machines().uses_run_strategy());
}

#[test]
fn create_serializes_for_cluster_version() {
    let transport = MockTransport::new();
    transport.respond_json(201, json!({}));
    let client = transport.client("v1.2.0");

    let mut spec = VmSpec::new(2, "4Gi");
    spec.add_image("rootdisk", "10Gi", "default/ubuntu");
    assert_eq!(spec.run_mode, RunMode::Running(true));
    let response = client
        .virtual_machines()
        .create("vm-1", "default", &spec)
        .unwrap();
    assert_eq!(response.status.as_u16(), 201);

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(
        path_of(request),
        "v1/harvester/kubevirt.io.virtualmachines/default"
    );
    let sent = sent_json(&request.body);
    assert_eq!(sent["spec"]["runStrategy"], "RerunOnFailure");
    assert!(sent["spec"].get("running").is_none());
    assert_eq!(sent["metadata"]["name"], "vm-1");
}

#[test]
fn refresh_version_resolves_again() {
    let transport = MockTransport::new();
    transport.respond_json(200, json!({"metadata": {"name": "server-version"}, "value": "v1.2.1"}));
    let mut client = transport.client("v1.0.0");
    assert!(!client.virtual_machines().uses_run_strategy());

    let version = client.refresh_version().unwrap();
    assert_eq!(version.to_string(), "v1.2.1");
    assert_eq!(client.cluster_version(), version);
    assert!(client.virtual_machines().uses_run_strategy());
    assert_eq!(
        path_of(&transport.requests()[0]),
        "v1/harvester/harvesterhci.io.settings/server-version"
    );
}

#[test]
fn refresh_version_surfaces_unexpected_status() {
    let transport = MockTransport::new();
    transport.respond_json(403, json!({"message": "forbidden"}));
    let mut client = transport.client("v1.0.0");
    let error = client.refresh_version().unwrap_err();
    assert_eq!(error.status_code().map(|s| s.as_u16()), Some(403));
}

#[test]
fn custom_registry_replaces_default() {
    let mut registry = ManagerRegistry::harvester().unwrap();
    registry
        .register::<HostManager>("custom-hosts", "v1.0.0", <HostManager as Manager>::base)
        .unwrap();
    let client = MockTransport::new().client("v1.2.0").with_registry(registry);
    assert!(client.variants().contains(&("host", "custom-hosts")));
    assert!(client.variants().contains(&("virtual machine", "run-strategy")));
}

#[test]
fn actions_use_the_action_query() {
    let transport = MockTransport::new();
    transport
        .respond(204, None, "")
        .respond(204, None, "")
        .respond(204, None, "");
    let client = transport.client("v1.2.0");

    let response = client.virtual_machines().start("vm-1", "default").unwrap();
    assert_eq!(response.status.as_u16(), 204);
    client
        .virtual_machines()
        .migrate("vm-1", "default", "node-2")
        .unwrap();
    client.hosts().maintenance_mode("node-0", true).unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(
        path_of(&requests[0]),
        "v1/harvester/kubevirt.io.virtualmachines/default/vm-1"
    );
    assert_eq!(
        requests[0].query,
        vec![("action".to_string(), "start".to_string())]
    );
    assert_eq!(sent_json(&requests[1].body), &json!({"nodeName": "node-2"}));
    assert_eq!(path_of(&requests[2]), "v1/harvester/nodes/node-0");
    assert_eq!(requests[2].query[0].1, "enableMaintenanceMode");
}

#[test]
fn delete_can_remove_disks() {
    let transport = MockTransport::new();
    transport
        .respond_json(200, vm_document())
        .respond_json(200, json!({}));
    let client = transport.client("v1.2.0");

    client
        .virtual_machines()
        .delete("vm-1", "default", true)
        .unwrap();
    let requests = transport.requests();
    assert_eq!(requests[1].method, Method::DELETE);
    assert_eq!(
        requests[1].query,
        vec![
            ("removedDisks".to_string(), "rootdisk".to_string()),
            ("propagationPolicy".to_string(), "Foreground".to_string()),
        ]
    );
}

#[test]
fn backup_target_round_trip() {
    let transport = MockTransport::new();
    let setting = json!({
        "apiVersion": "harvesterhci.io/v1beta1",
        "kind": "Setting",
        "metadata": {"name": "backup-target", "resourceVersion": "9"},
        "value": r#"{"type":"nfs","endpoint":"nfs://10.0.0.1:/backups"}"#,
    });
    transport
        .respond_json(200, setting.clone())
        .respond_json(200, setting)
        .respond_json(200, json!({}));
    let client = transport.client("v1.2.0");

    let mut spec = client.settings().backup_target().unwrap();
    assert_eq!(
        spec.target,
        Some(BackupTarget::Nfs {
            endpoint: "nfs://10.0.0.1:/backups".to_string()
        })
    );
    spec.target = None;
    assert_eq!(spec.render("backup-target", "").unwrap()["value"], "");
    client.settings().set_backup_target(&spec).unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    let sent = sent_json(&requests[2].body);
    assert_eq!(sent["value"], "");
    assert_eq!(sent["metadata"]["resourceVersion"], "9");
    assert_eq!(
        BackupTargetSpec::disabled().target,
        None::<BackupTarget>
    );
}

#[test]
fn restore_into_new_vm() {
    let transport = MockTransport::new();
    transport.respond(204, None, "");
    let client = transport.client("v1.2.0");

    let target = Restore::New {
        vm_name: "vm-1-copy".to_string(),
    };
    client
        .backups()
        .restore("nightly", "default", &target)
        .unwrap();
    let request = &transport.requests()[0];
    assert_eq!(
        path_of(request),
        "v1/harvester/harvesterhci.io.virtualmachinebackups/default/nightly"
    );
    assert_eq!(sent_json(&request.body)["name"], "vm-1-copy");
}

#[test]
fn spec_variant_for_halted_vm() {
    let client = MockTransport::new().client("v1.1.0");
    let mut spec = client.virtual_machines().spec(1, "2Gi");
    spec.run_mode = RunMode::Strategy(RunStrategy::Halted);
    let document = spec.render("vm-2", "default").unwrap();
    assert_eq!(document["spec"]["runStrategy"], "Halted");
}

#[test]
fn update_serializes_for_cluster_version() {
    let transport = MockTransport::new();
    transport
        .respond_json(200, vm_document())
        .respond_json(200, json!({}));
    let client = transport.client("v1.2.0");

    let spec = VmSpec::new(2, "4Gi");
    client
        .virtual_machines()
        .update("vm-1", "default", &spec, UpdatePolicy::Optimistic)
        .unwrap();
    let sent = sent_json(&transport.requests()[1].body).clone();
    assert_eq!(sent["spec"]["runStrategy"], "RerunOnFailure");
    assert!(sent["spec"].get("running").is_none());
    assert_eq!(sent["metadata"]["resourceVersion"], "4242");
}

#[test]
fn update_keeps_running_on_old_clusters() {
    let transport = MockTransport::new();
    transport
        .respond_json(200, vm_document())
        .respond_json(200, json!({}));
    let client = transport.client("v1.0.3");

    let mut spec = VmSpec::from_document(vm_document()).unwrap();
    spec.run_mode = RunMode::Strategy(RunStrategy::Halted);
    client
        .virtual_machines()
        .update("vm-1", "default", &spec, UpdatePolicy::Optimistic)
        .unwrap();
    let sent = sent_json(&transport.requests()[1].body).clone();
    assert_eq!(sent["spec"]["running"], false);
    assert!(sent["spec"].get("runStrategy").is_none());
}

#[test]
fn opaque_update_keeps_content_type() {
    let transport = MockTransport::new();
    transport.respond(200, Some("application/yaml"), "kind: VirtualMachine\n");
    let client = transport.client("v1.2.0");

    let manifest = b"apiVersion: kubevirt.io/v1\nkind: VirtualMachine\n".to_vec();
    let response = client
        .virtual_machines()
        .delegate()
        .update_as(
            "v1/harvester/kubevirt.io.virtualmachines/default/vm-1",
            manifest.clone(),
            "application/yaml",
            RequestArgs::new(),
        )
        .unwrap();
    assert_eq!(response.payload.as_text(), Some("kind: VirtualMachine\n"));

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::PUT);
    assert_eq!(
        request.body,
        Body::Raw {
            data: manifest,
            content_type: "application/yaml".to_string(),
        }
    );
}

#[test]
fn patch_verb() {
    let transport = MockTransport::new();
    transport.respond_json(200, json!({"spec": {"unschedulable": true}}));
    let client = transport.client("v1.2.0");

    let body = json!([{"op": "add", "path": "/spec/unschedulable", "value": true}]);
    let response = client
        .hosts()
        .delegate()
        .patch(
            "v1/harvester/nodes/node-0",
            RequestArgs::new().raw_body(body.to_string(), "application/json-patch+json"),
        )
        .unwrap();
    assert_eq!(response.json().unwrap()["spec"]["unschedulable"], true);

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(path_of(request), "v1/harvester/nodes/node-0");
    match &request.body {
        Body::Raw { data, content_type } => {
            assert_eq!(content_type, "application/json-patch+json");
            assert_eq!(serde_json::from_slice::<Value>(data).unwrap(), body);
        }
        other => panic!("expected a raw body, got {:?}", other),
    }
}

#[test]
fn raw_get_leaves_json_undecoded() {
    let transport = MockTransport::new();
    transport.respond(200, Some("application/json"), r#"{"value": "v1.2.0"}"#);
    let client = transport.client("v1.2.0");

    let response = client
        .settings()
        .delegate()
        .get_raw(
            "v1/harvester/harvesterhci.io.settings/server-version",
            RequestArgs::new(),
        )
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(response.text(), r#"{"value": "v1.2.0"}"#);
}
