//! Name-addressed generation end to end with the loopback engine

use cosim_gateway::{Frame, GatewayError, Generation, Matrix, Value};
use cosim_tests::{approx_eq, as_bool, as_f64, as_f64s, as_i32s, Harness};
use pretty_assertions::assert_eq;

const MESH: &str = "Solid-Mesh";

/// Constructed session with three vertices on the solid mesh
fn setup() -> Harness {
    let mut h = Harness::new(Generation::Participant);
    h.construct().unwrap();
    let ids = h.ok(
        "setMeshVertices",
        [
            Value::str(MESH),
            Value::int32(3),
            Value::floats(vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0]),
        ],
    );
    assert_eq!(as_i32s(&ids), vec![0, 1, 2]);
    h
}

fn write_temperature(h: &mut Harness, values: Vec<f64>) {
    h.ok(
        "writeData",
        [
            Value::str(MESH),
            Value::str("Temperature"),
            Value::Int32(vec![0, 1, 2]),
            Value::floats(values),
        ],
    );
}

fn read_temperature(h: &mut Harness, relative_read_time: f64) -> Vec<f64> {
    as_f64s(&h.ok(
        "readData",
        [
            Value::str(MESH),
            Value::str("Temperature"),
            Value::int32(3),
            Value::Int32(vec![0, 1, 2]),
            Value::float64(relative_read_time),
        ],
    ))
}

#[test]
fn test_coupling_loop_runs_to_the_end() {
    let mut h = setup();
    assert!(!as_bool(&h.ok("requiresInitialData", [])));
    assert_eq!(h.ok("initialize", []), Frame::empty());

    let mut windows = 0;
    while as_bool(&h.ok("isCouplingOngoing", [])) {
        let dt = as_f64(&h.ok("getMaxTimeStepSize", []));
        assert!(dt > 0.0, "window {} offers no step", windows);

        write_temperature(&mut h, vec![dt; 3]);
        assert_eq!(h.ok("advance", [Value::float64(dt)]), Frame::empty());
        assert!(as_bool(&h.ok("isTimeWindowComplete", [])));
        windows += 1;
        assert!(windows <= 3, "coupling did not end");
    }
    assert_eq!(windows, 3);
    assert!(approx_eq(as_f64(&h.ok("getMaxTimeStepSize", [])), 0.0));

    h.ok("finalize", []);
    h.ok("destructor", []);
    assert!(!h.session.is_constructed());
}

#[test]
fn test_subcycling_within_a_window() {
    let mut h = setup();
    h.ok("initialize", []);

    h.ok("advance", [Value::float64(0.04)]);
    assert!(!as_bool(&h.ok("isTimeWindowComplete", [])));
    let dt = as_f64(&h.ok("getMaxTimeStepSize", []));
    assert!(approx_eq(dt, 0.06));

    // Stepping past the window is an engine error
    let err = h.call("advance", [Value::float64(0.5)]).unwrap_err();
    assert!(matches!(err, GatewayError::EngineFailure(_)));

    h.ok("advance", [Value::float64(dt)]);
    assert!(as_bool(&h.ok("isTimeWindowComplete", [])));
}

#[test]
fn test_write_then_read_back() {
    let mut h = setup();
    h.ok("initialize", []);
    let dt = as_f64(&h.ok("getMaxTimeStepSize", []));

    write_temperature(&mut h, vec![1.0, 2.0, 3.0]);
    assert_eq!(read_temperature(&mut h, dt), vec![1.0, 2.0, 3.0]);
    assert_eq!(read_temperature(&mut h, 0.0), vec![0.0, 0.0, 0.0]);

    let mid = read_temperature(&mut h, dt / 2.0);
    assert!(mid.iter().zip([0.5, 1.0, 1.5]).all(|(a, b)| approx_eq(*a, b)));

    // After the window completes the written sample is the new start
    h.ok("advance", [Value::float64(dt)]);
    assert_eq!(read_temperature(&mut h, 0.0), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_vector_data_round_trip() {
    let mut h = setup();
    h.ok("initialize", []);
    let dims = h.ok("getDataDimensions", [Value::str(MESH), Value::str("Displacement")]);
    assert_eq!(dims, Frame::from(Value::UInt8(2)));

    h.ok(
        "writeData",
        [
            Value::str(MESH),
            Value::str("Displacement"),
            Value::Int32(vec![2, 0]),
            Value::floats(vec![2.0, 2.5, 0.0, 0.5]),
        ],
    );
    let dt = as_f64(&h.ok("getMaxTimeStepSize", []));
    let values = h.ok(
        "readData",
        [
            Value::str(MESH),
            Value::str("Displacement"),
            Value::int32(2),
            Value::Int32(vec![0, 2]),
            Value::float64(dt),
        ],
    );
    assert_eq!(as_f64s(&values), vec![0.0, 0.5, 2.0, 2.5]);
}

#[test]
fn test_write_length_mismatch_never_reaches_engine() {
    let mut h = setup();
    h.ok("initialize", []);

    // Three values for two vertices of scalar data
    let err = h
        .call(
            "writeData",
            [
                Value::str(MESH),
                Value::str("Temperature"),
                Value::Int32(vec![0, 1]),
                Value::floats(vec![1.0, 2.0, 3.0]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    // Divisible but wrong for the data dimension
    let err = h
        .call(
            "writeData",
            [
                Value::str(MESH),
                Value::str("Temperature"),
                Value::Int32(vec![0, 1]),
                Value::floats(vec![1.0, 2.0, 3.0, 4.0]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    let dt = as_f64(&h.ok("getMaxTimeStepSize", []));
    assert_eq!(read_temperature(&mut h, dt), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_read_size_must_match_ids() {
    let mut h = setup();
    h.ok("initialize", []);
    let err = h
        .call(
            "readData",
            [
                Value::str(MESH),
                Value::str("Temperature"),
                Value::int32(2),
                Value::Int32(vec![0, 1, 2]),
                Value::float64(0.0),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));
}

#[test]
fn test_vertex_ids_continue_across_calls() {
    let mut h = setup();
    let id = h.ok("setMeshVertex", [Value::str(MESH), Value::floats(vec![3.0, 0.0])]);
    assert_eq!(id, Frame::from(Value::int32(3)));

    let ids = h.ok(
        "setMeshVertices",
        [Value::str(MESH), Value::int32(2), Value::floats(vec![4.0, 0.0, 5.0, 0.0])],
    );
    assert_eq!(as_i32s(&ids), vec![4, 5]);
    assert_eq!(h.ok("getMeshVertexSize", [Value::str(MESH)]), Frame::from(Value::int32(6)));

    // Position length must match the mesh dimension
    let err = h
        .call("setMeshVertex", [Value::str(MESH), Value::floats(vec![1.0, 2.0, 3.0])])
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));
}

#[test]
fn test_mesh_connectivity() {
    let mut h = setup();
    h.ok("setMeshVertex", [Value::str(MESH), Value::floats(vec![0.0, 1.0])]);
    assert!(as_bool(&h.ok("requiresMeshConnectivityFor", [Value::str(MESH)])));

    h.ok("setMeshEdge", [Value::str(MESH), Value::int32(0), Value::int32(1)]);
    h.ok(
        "setMeshEdges",
        [Value::str(MESH), Value::int32(2), Value::Int32(vec![1, 2, 2, 3])],
    );
    h.ok(
        "setMeshTriangle",
        [Value::str(MESH), Value::int32(0), Value::int32(1), Value::int32(3)],
    );
    h.ok(
        "setMeshQuads",
        [Value::str(MESH), Value::Int32(vec![0, 1, 2, 3])],
    );

    // Ragged id list is rejected before the engine
    let err = h
        .call("setMeshTriangles", [Value::str(MESH), Value::Int32(vec![0, 1])])
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    // Unknown vertex is an engine error
    let err = h
        .call("setMeshEdge", [Value::str(MESH), Value::int32(0), Value::int32(9)])
        .unwrap_err();
    assert!(matches!(err, GatewayError::EngineFailure(_)));

    let counts = h.session.engine().unwrap().connectivity_counts(MESH).unwrap();
    assert_eq!(counts, [3, 1, 1, 0]);
}

#[test]
fn test_mesh_edges_count_must_match_ids() {
    let mut h = setup();
    h.ok("setMeshVertex", [Value::str(MESH), Value::floats(vec![0.0, 1.0])]);

    h.ok(
        "setMeshEdges",
        [Value::str(MESH), Value::int32(2), Value::Int32(vec![0, 1, 1, 2])],
    );

    // Declared edge count disagrees with the id list
    let err = h
        .call(
            "setMeshEdges",
            [Value::str(MESH), Value::int32(3), Value::Int32(vec![0, 1, 1, 2])],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    // The count cannot be left out
    let err = h
        .call("setMeshEdges", [Value::str(MESH), Value::Int32(vec![0, 1, 1, 2])])
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    let counts = h.session.engine().unwrap().connectivity_counts(MESH).unwrap();
    assert_eq!(counts[0], 2);
}

#[test]
fn test_gradient_data() {
    let mut h = setup();
    assert!(as_bool(&h.ok(
        "requiresGradientDataFor",
        [Value::str(MESH), Value::str("Displacement")]
    )));
    assert!(!as_bool(&h.ok(
        "requiresGradientDataFor",
        [Value::str(MESH), Value::str("Temperature")]
    )));

    // 2-D data on a 2-D mesh: four gradient values per vertex
    h.ok(
        "writeGradientData",
        [
            Value::str(MESH),
            Value::str("Displacement"),
            Value::int32(1),
            Value::int32(1),
            Value::floats(vec![1.0, 2.0, 3.0, 4.0]),
        ],
    );
    let stored = h
        .session
        .engine()
        .unwrap()
        .gradient_of(MESH, "Displacement", 1)
        .unwrap();
    assert_eq!(stored, vec![1.0, 2.0, 3.0, 4.0]);

    let err = h
        .call(
            "writeGradientData",
            [
                Value::str(MESH),
                Value::str("Displacement"),
                Value::int32(1),
                Value::int32(1),
                Value::floats(vec![1.0, 2.0]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));
}

#[test]
fn test_direct_mesh_access() {
    let mut h = setup();
    let fluid = Value::str("Fluid-Mesh");
    assert_eq!(h.ok("getMeshVertexSize", [fluid.clone()]), Frame::from(Value::int32(0)));

    // Bounding box needs 2 * dim values
    let err = h
        .call("setMeshAccessRegion", [fluid.clone(), Value::floats(vec![0.0, 1.0])])
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    h.ok(
        "setMeshAccessRegion",
        [fluid.clone(), Value::floats(vec![0.5, 2.5, -1.0, 1.0])],
    );
    h.ok("initialize", []);
    assert_eq!(h.ok("getMeshVertexSize", [fluid.clone()]), Frame::from(Value::int32(2)));

    let out = h.ok("getMeshVerticesAndIDs", [fluid.clone(), Value::int32(2)]);
    assert_eq!(
        out,
        Frame::from(vec![
            Value::Int32(vec![1, 2]),
            Value::Float64(Matrix::from_records(&[1.0, 0.0, 2.0, 0.0], 2, 3)),
        ])
    );

    let err = h
        .call("getMeshVerticesAndIDs", [fluid, Value::int32(4)])
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));
}

#[test]
fn test_dimension_queries() {
    let mut h = setup();
    assert_eq!(
        h.ok("getMeshDimensions", [Value::str(MESH)]),
        Frame::from(Value::UInt8(2))
    );
    let err = h.call("getMeshDimensions", [Value::str("Nope")]).unwrap_err();
    assert!(matches!(err, GatewayError::EngineFailure(_)));
}
