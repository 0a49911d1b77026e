// This is free and unencumbered software released into the public domain.

// JNI exports for `com.example.edgedetectionapp.NativeProcessor` and
// `com.example.edgedetectionapp.CameraManager`.

use crate::{
    logging, native,
    shared::{
        CameraConfig, CameraController, CameraError, Frame, FrameSink, FrameTarget,
        PermissionSource, SurfaceListener,
        drivers::camera2::{NativeWindow, NativeWindowSurface},
        open_camera,
    },
};
use core::ffi::c_void;
use core::ptr::null_mut;
use jni::{
    JNIEnv, JavaVM,
    objects::{GlobalRef, JObject, JValue},
    sys::{JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6, jboolean, jint, jlong, jstring},
};
use std::sync::Arc;
use tracing::{error, info, warn};

const CAMERA_PERMISSION: &str = "android.permission.CAMERA";

/// `PackageManager.PERMISSION_GRANTED`
const PERMISSION_GRANTED: i32 = 0;

/// Asks the host's `Context` for the camera permission on every check.
struct JniPermission {
    vm: JavaVM,
    context: GlobalRef,
}

impl JniPermission {
    fn check(&self) -> jni::errors::Result<bool> {
        let mut env = self.vm.attach_current_thread()?;
        let permission = env.new_string(CAMERA_PERMISSION)?;
        let result = env
            .call_method(
                self.context.as_obj(),
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[(&permission).into()],
            )?
            .i()?;
        Ok(result == PERMISSION_GRANTED)
    }
}

impl PermissionSource for JniPermission {
    fn camera_granted(&self) -> bool {
        self.check().unwrap_or_else(|err| {
            warn!(%err, "checkSelfPermission failed");
            false
        })
    }
}

/// Calls `onFrame(ByteArray, Int, Int)` on the Kotlin camera manager.
fn jni_frame_sink(vm: JavaVM, target: GlobalRef) -> FrameSink {
    Arc::new(move |frame: Frame| {
        let result = vm.attach_current_thread_permanently().and_then(|mut env| {
            let data = env.byte_array_from_slice(&frame.data)?;
            env.call_method(
                target.as_obj(),
                "onFrame",
                "([BII)V",
                &[
                    (&data).into(),
                    JValue::Int(frame.width as i32),
                    JValue::Int(frame.height as i32),
                ],
            )?;
            env.delete_local_ref(data)
        });
        if let Err(err) = result {
            warn!(%err, "failed to deliver frame to Kotlin");
        }
    })
}

struct NativeCamera {
    controller: CameraController,
    surface: Arc<NativeWindowSurface>,
    listener: SurfaceListener,
}

impl NativeCamera {
    fn create(
        env: &mut JNIEnv,
        this: &JObject,
        context: &JObject,
        deliver_frames: bool,
    ) -> Result<Self, CameraError> {
        let jni = |err: jni::errors::Error| CameraError::driver("creating camera", err);
        let permission = JniPermission {
            vm: env.get_java_vm().map_err(jni)?,
            context: env.new_global_ref(context).map_err(jni)?,
        };

        let (config, on_frame) = if deliver_frames {
            let sink = jni_frame_sink(
                env.get_java_vm().map_err(jni)?,
                env.new_global_ref(this).map_err(jni)?,
            );
            (
                CameraConfig::new().with_frame_target(FrameTarget::PreviewAndReader),
                sink,
            )
        } else {
            let sink: FrameSink = Arc::new(|_: Frame| {});
            (CameraConfig::new(), sink)
        };

        let surface = Arc::new(NativeWindowSurface::new());
        let controller = open_camera(Arc::new(permission), surface.clone(), config, on_frame)?;
        let listener = controller.surface_listener();
        Ok(Self {
            controller,
            surface,
            listener,
        })
    }
}

/// # Safety
/// `handle` must be zero or a live pointer returned by `nativeCreate`.
unsafe fn camera<'a>(handle: jlong) -> Option<&'a mut NativeCamera> {
    unsafe { (handle as *mut NativeCamera).as_mut() }
}

fn jbool(value: bool) -> jboolean {
    if value { JNI_TRUE } else { JNI_FALSE }
}

#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    logging::init();
    JNI_VERSION_1_6
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_NativeProcessor_testOpenCV(
    mut env: JNIEnv,
    _this: JObject,
) -> jstring {
    match env.new_string(native::version()) {
        Ok(s) => s.into_raw(),
        Err(err) => {
            error!(%err, "failed to create version string");
            null_mut()
        },
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_NativeProcessor_nativeInit(
    _env: JNIEnv,
    _this: JObject,
) -> jboolean {
    jbool(native::initialize().is_ok())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeCreate(
    mut env: JNIEnv,
    this: JObject,
    context: JObject,
    deliver_frames: jboolean,
) -> jlong {
    logging::init();
    match NativeCamera::create(&mut env, &this, &context, deliver_frames != JNI_FALSE) {
        Ok(camera) => {
            info!(deliver_frames = deliver_frames != JNI_FALSE, "camera controller created");
            Box::into_raw(Box::new(camera)) as jlong
        },
        Err(err) => {
            error!(%err, "failed to create camera controller");
            0
        },
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeStart(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
) {
    if let Some(camera) = unsafe { camera(handle) } {
        camera.controller.start();
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeStop(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
) {
    if let Some(camera) = unsafe { camera(handle) } {
        camera.controller.stop();
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeSurfaceAvailable(
    env: JNIEnv,
    _this: JObject,
    handle: jlong,
    surface: JObject,
    width: jint,
    height: jint,
) {
    let Some(camera) = (unsafe { camera(handle) }) else {
        return;
    };
    match unsafe { NativeWindow::from_surface(env.get_raw(), surface.as_raw()) } {
        Some(window) => camera.surface.attach(window),
        None => {
            error!("surface has no native window");
            return;
        },
    }
    camera
        .listener
        .on_surface_available(width.max(0) as u32, height.max(0) as u32);
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeSurfaceSizeChanged(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
    width: jint,
    height: jint,
) {
    if let Some(camera) = unsafe { camera(handle) } {
        camera
            .listener
            .on_surface_size_changed(width.max(0) as u32, height.max(0) as u32);
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeSurfaceDestroyed(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
) -> jboolean {
    let Some(camera) = (unsafe { camera(handle) }) else {
        return JNI_TRUE;
    };
    let release = camera.listener.on_surface_destroyed();
    camera.surface.detach();
    jbool(release)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeSurfaceUpdated(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
) {
    if let Some(camera) = unsafe { camera(handle) } {
        camera.listener.on_surface_updated();
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeState(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
) -> jint {
    unsafe { camera(handle) }.map_or(0, |camera| camera.controller.state().as_i32())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_edgedetectionapp_CameraManager_nativeDestroy(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
) {
    if handle != 0 {
        let camera = unsafe { Box::from_raw(handle as *mut NativeCamera) };
        drop(camera);
        info!("camera controller destroyed");
    }
}
