use std::rc::Rc;

use retained_gl::descriptor::ContextDescriptor;
use retained_gl::driver::{Call, DriverError, FailurePoint, RecordingDriver, ShaderStage};
use retained_gl::resource::{
    AttributeType, BufferUsage, ElementBuffer, PixelFormat, Program, Resource, ShaderStorageBuffer,
    Texture, VertexBuffer, VertexLayout,
};
use retained_gl::{BootstrapCause, BootstrapStep, Context, FixedBuffer};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bootstrap(descriptor: &ContextDescriptor) -> (Rc<RecordingDriver>, Context) {
    init_logging();

    let driver = Rc::new(RecordingDriver::new());
    let context = Context::bootstrap(driver.clone(), descriptor).unwrap();

    (driver, context)
}

#[test]
fn pos_color_end_to_end() {
    let (driver, mut context) = bootstrap(&ContextDescriptor::default());

    let layout = context.get::<VertexLayout>("PosColor").unwrap();
    let attributes = layout.attributes();

    assert_eq!(attributes.len(), 2);

    assert_eq!(attributes[0].component_count, 2);
    assert_eq!(attributes[0].component_type, AttributeType::Float);
    assert_eq!(attributes[0].offset, 0);
    assert!(!attributes[0].normalized);

    assert_eq!(attributes[1].component_count, 4);
    assert_eq!(attributes[1].component_type, AttributeType::UnsignedByte);
    assert_eq!(attributes[1].offset, 8);
    assert!(attributes[1].normalized);

    let binds_before = driver.use_program_count();

    assert!(context.set_active::<Program>("PosColor").unwrap());
    assert!(!context.set_active::<Program>("PosColor").unwrap());

    assert_eq!(driver.use_program_count() - binds_before, 1);
    assert_eq!(
        context.active::<Program>(),
        Some(context.get::<Program>("PosColor").unwrap().id())
    );
}

#[test]
fn bootstrap_is_deterministic() {
    let (_, first) = bootstrap(&ContextDescriptor::default());
    let (_, second) = bootstrap(&ContextDescriptor::default());

    let first = first.registry();
    let second = second.registry();

    assert!(first.programs().names().eq(second.programs().names()));
    assert!(first
        .vertex_layouts()
        .names()
        .eq(second.vertex_layouts().names()));
    assert!(first
        .vertex_buffers()
        .names()
        .eq(second.vertex_buffers().names()));
    assert!(first
        .element_buffers()
        .names()
        .eq(second.element_buffers().names()));
    assert!(first
        .shader_storage_buffers()
        .names()
        .eq(second.shader_storage_buffers().names()));
    assert!(first.textures().names().eq(second.textures().names()));

    for (name, layout) in first.vertex_layouts().iter() {
        let other = &second.vertex_layouts()[name];

        assert_eq!(layout.attributes(), other.attributes());
        assert_eq!(layout.stride(), other.stride());
    }
}

#[test]
fn every_program_compiles_its_own_stages() {
    let (driver, _context) = bootstrap(&ContextDescriptor::default());

    let fragment_compiles = driver.count(|call| *call == Call::CompileShader(ShaderStage::Fragment));
    let vertex_compiles = driver.count(|call| *call == Call::CompileShader(ShaderStage::Vertex));

    assert_eq!(vertex_compiles, 5);
    assert_eq!(fragment_compiles, 5);
}

#[test]
fn overwriting_destroys_the_previous_resource() {
    let (driver, mut context) = bootstrap(&ContextDescriptor::default());

    let first_id = context.get::<Texture>("default").unwrap().id();
    let replacement = Texture::new(context.driver()).unwrap();
    let replacement_id = replacement.id();

    assert!(context.insert("default", replacement));

    assert!(!driver.is_live(first_id));
    assert_eq!(context.get::<Texture>("default").unwrap().id(), replacement_id);
    assert_eq!(context.registry().textures().len(), 1);
}

#[test]
fn shader_failure_aborts_bootstrap() {
    init_logging();

    let driver = Rc::new(RecordingDriver::new());

    driver.fail_at(FailurePoint::ShaderSource("sampler2D".to_string()));

    let error = Context::bootstrap(driver.clone(), &ContextDescriptor::default()).unwrap_err();

    assert_eq!(error.step, BootstrapStep::Programs);
    assert_eq!(error.resource, "PosTex");

    match error.cause {
        BootstrapCause::Driver(DriverError::ShaderCompilation { stage, .. }) => {
            assert_eq!(stage, ShaderStage::Fragment)
        }
        cause => panic!("unexpected cause: {}", cause),
    }

    // Nothing survives, and the program was never linked.
    assert_eq!(driver.live_objects(), 0);
    assert_eq!(
        driver.count(|call| match call {
            Call::LinkProgram { .. } => true,
            _ => false,
        }),
        2
    );
}

#[test]
fn framebuffer_failure_creates_nothing_else() {
    init_logging();

    let driver = Rc::new(RecordingDriver::new());

    driver.fail_at(FailurePoint::Framebuffer);

    let error = Context::bootstrap(driver.clone(), &ContextDescriptor::default()).unwrap_err();

    assert_eq!(error.step, BootstrapStep::Framebuffer);
    assert_eq!(driver.calls(), vec![Call::CreateFramebuffer]);
}

#[test]
fn default_buffers_round_trip_data() {
    let descriptor = ContextDescriptor::begin()
        .default_buffer_usage(BufferUsage::DynamicDraw)
        .finish();
    let (_, mut context) = bootstrap(&descriptor);

    let vertices = FixedBuffer::from(vec![[0.0f32, 0.5], [1.0, -1.0], [-1.0, -1.0]]);
    let buffer = context.get_mut::<VertexBuffer>("default").unwrap();

    buffer.upload(&vertices).unwrap();

    assert_eq!(buffer.usage(), BufferUsage::DynamicDraw);
    assert_eq!(buffer.download::<[f32; 2]>().unwrap(), vertices);

    let indices = context.get_mut::<ElementBuffer>("default").unwrap();

    indices.upload_slice(&[0u16, 1, 2]).unwrap();

    assert_eq!(indices.size_in_bytes(), 6);

    let storage = context.get_mut::<ShaderStorageBuffer>("default").unwrap();

    assert_eq!(storage.download::<f32>().unwrap().len(), 0);

    let texture = context.get_mut::<Texture>("default").unwrap();

    texture
        .upload(1, 2, PixelFormat::from_channel_count(2).unwrap(), &[0; 4])
        .unwrap();

    assert_eq!((texture.width(), texture.height()), (1, 2));
}

#[test]
fn descriptor_survives_json() {
    let descriptor = ContextDescriptor::default();

    let json = serde_json::to_string_pretty(&descriptor).unwrap();
    let decoded: ContextDescriptor = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, descriptor);
    assert!(json.contains("\"component_type\": \"unsigned-byte\""));
    assert!(json.contains("\"default_buffer_usage\": \"static-draw\""));
}
